//! Shared User-Agent string for query and retrieval HTTP clients.
//!
//! The platform's web endpoints reject obvious non-browser agents, so both the
//! query client and the retriever present the same desktop browser identity.
//! Keeping one source means bootstrap, queries and CDN fetches stay consistent.

/// Desktop Chrome User-Agent used when the caller does not supply one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Returns the configured agent, or the default when `configured` is blank.
#[must_use]
pub fn effective_user_agent(configured: &str) -> &str {
    let trimmed = configured.trim();
    if trimmed.is_empty() {
        DEFAULT_USER_AGENT
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent_looks_like_a_browser() {
        assert!(DEFAULT_USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(DEFAULT_USER_AGENT.contains("Chrome/"));
        assert!(
            !DEFAULT_USER_AGENT.contains("  "),
            "line continuation must not leave double spaces"
        );
    }

    #[test]
    fn test_effective_user_agent_falls_back_on_blank() {
        assert_eq!(effective_user_agent("   "), DEFAULT_USER_AGENT);
        assert_eq!(effective_user_agent(" custom/1.0 "), "custom/1.0");
    }
}
