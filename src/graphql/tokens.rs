//! Session token extraction from the web root HTML.
//!
//! The page embeds `lsd` and `fb_dtsg` in several places depending on the
//! rollout it was served from. Each token has an ordered list of patterns and
//! the first capture wins.

use std::sync::LazyLock;

use regex::Regex;

/// Anti-CSRF tokens required by every query.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SessionTokens {
    pub lsd: String,
    pub fb_dtsg: String,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens")
            .field("lsd", &"[REDACTED]")
            .field("fb_dtsg", &"[REDACTED]")
            .finish()
    }
}

#[allow(clippy::expect_used)]
static LSD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""LSD",\[\],\{"token":"([^"]+)"\}"#,
        r#""lsd"\s*:\s*"\s*([^"]+)\s*""#,
        r#"name="lsd"\s+value="([^"]+)""#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static lsd pattern"))
    .collect()
});

#[allow(clippy::expect_used)]
static DTSG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""DTSGInitialData",\[\],\{"token":"([^"]+)"\}"#,
        r#""fb_dtsg"\s*:\s*"\s*([^"]+)\s*""#,
        r#"name="fb_dtsg"\s+value="([^"]+)""#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static fb_dtsg pattern"))
    .collect()
});

/// Extracts both tokens, or reports which ones are missing.
pub(crate) fn extract_tokens(html: &str) -> Result<SessionTokens, Vec<&'static str>> {
    let lsd = first_match(&LSD_PATTERNS, html);
    let fb_dtsg = first_match(&DTSG_PATTERNS, html);
    match (lsd, fb_dtsg) {
        (Some(lsd), Some(fb_dtsg)) => Ok(SessionTokens { lsd, fb_dtsg }),
        (lsd, fb_dtsg) => {
            let mut missing = Vec::new();
            if lsd.is_none() {
                missing.push("lsd");
            }
            if fb_dtsg.is_none() {
                missing.push("fb_dtsg");
            }
            Err(missing)
        }
    }
}

fn first_match(patterns: &[Regex], html: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// Checksum the query endpoint expects next to `fb_dtsg`.
///
/// `"2"` followed by the decimal sum of the token's character codes.
pub(crate) fn jazoest(fb_dtsg: &str) -> String {
    let sum: u64 = fb_dtsg.chars().map(|c| u64::from(u32::from(c))).sum();
    format!("2{sum}")
}
