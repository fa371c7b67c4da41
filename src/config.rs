//! Run configuration: defaults, CLI-facing fields and validation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};

use crate::user_agent::DEFAULT_USER_AGENT;

/// Default session export location, relative to the working directory.
pub const DEFAULT_COOKIES_PATH: &str = "cookies.txt";

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_ROOT: &str = "out";

/// Default total timeout for a single query (bootstrap or GraphQL POST).
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default total timeout for a single media retrieval.
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default lower bound of the randomized pacing interval.
pub const DEFAULT_PACE_MIN: Duration = Duration::from_millis(250);

/// Default upper bound of the randomized pacing interval.
pub const DEFAULT_PACE_MAX: Duration = Duration::from_millis(750);

/// Resolved configuration for one archive run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target profile name (a leading `@` is accepted).
    pub username: String,
    /// Path to the session export (Netscape `cookies.txt` or Cookie-Editor JSON).
    pub cookies_path: PathBuf,
    /// Root directory under which `<user>/...` is created.
    pub output_root: PathBuf,
    /// User-Agent presented to both the web root and the CDN.
    pub user_agent: String,
    /// Total timeout per query.
    pub query_timeout: Duration,
    /// Total timeout per retrieval.
    pub retrieval_timeout: Duration,
    /// Lower pacing bound; zero together with `pace_max` disables pacing.
    pub pace_min: Duration,
    /// Upper pacing bound.
    pub pace_max: Duration,
    /// Skip the story highlights section.
    pub skip_highlights: bool,
}

impl Config {
    /// Creates a configuration with defaults for everything except the username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            cookies_path: PathBuf::from(DEFAULT_COOKIES_PATH),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
            pace_min: DEFAULT_PACE_MIN,
            pace_max: DEFAULT_PACE_MAX,
            skip_highlights: false,
        }
    }

    /// Returns whether the run should gate requests through a pacer.
    #[must_use]
    pub fn pacing_enabled(&self) -> bool {
        !self.pace_max.is_zero()
    }

    /// Validates field values before any I/O happens.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().trim_start_matches('@').is_empty() {
            bail!("Invalid value for `username`: must not be empty");
        }
        if self.cookies_path.as_os_str().is_empty() {
            bail!("Invalid value for `cookies_path`: must not be empty");
        }
        if self.user_agent.trim().is_empty() {
            bail!("Invalid value for `user_agent`: must not be empty");
        }
        validate_timeout("query_timeout", self.query_timeout)?;
        validate_timeout("retrieval_timeout", self.retrieval_timeout)?;
        if self.pacing_enabled() && self.pace_max < self.pace_min {
            bail!(
                "Invalid value for `pace_max`: {}ms is below `pace_min` ({}ms)",
                self.pace_max.as_millis(),
                self.pace_min.as_millis()
            );
        }
        Ok(())
    }
}

fn validate_timeout(field: &str, value: Duration) -> Result<()> {
    if value.is_zero() || value > Duration::from_secs(3600) {
        bail!(
            "Invalid value for `{field}`: {}s. Expected range: 1..=3600",
            value.as_secs()
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_are_valid() {
        let config = Config::new("someone");
        assert!(config.validate().is_ok());
        assert_eq!(config.cookies_path, PathBuf::from("cookies.txt"));
        assert_eq!(config.output_root, PathBuf::from("out"));
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(config.retrieval_timeout, Duration::from_secs(60));
        assert!(config.pacing_enabled());
    }

    #[test]
    fn test_config_rejects_bare_at_sign_username() {
        let err = Config::new(" @ ").validate().unwrap_err();
        assert!(err.to_string().contains("username"), "got: {err}");
    }

    #[test]
    fn test_config_rejects_inverted_pace_bounds() {
        let mut config = Config::new("someone");
        config.pace_min = Duration::from_millis(500);
        config.pace_max = Duration::from_millis(100);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pace_max"), "got: {err}");
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let mut config = Config::new("someone");
        config.retrieval_timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retrieval_timeout"), "got: {err}");
    }

    #[test]
    fn test_config_zero_pace_disables_pacing() {
        let mut config = Config::new("someone");
        config.pace_min = Duration::ZERO;
        config.pace_max = Duration::ZERO;
        assert!(config.validate().is_ok());
        assert!(!config.pacing_enabled());
    }

    #[test]
    fn test_config_zero_pace_max_alone_disables_pacing() {
        let mut config = Config::new("someone");
        config.pace_max = Duration::ZERO;
        assert!(config.validate().is_ok());
        assert!(!config.pacing_enabled());
    }
}
