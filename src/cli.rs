//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use idl_core::Config;
use idl_core::config::{DEFAULT_COOKIES_PATH, DEFAULT_OUTPUT_ROOT};
use idl_core::user_agent::DEFAULT_USER_AGENT;

/// Archive a profile's posts, reels and story highlights.
///
/// Requests are made with the cookies of a logged-in browser session,
/// exported as a Netscape `cookies.txt` or a Cookie-Editor JSON file.
#[derive(Parser, Debug)]
#[command(name = "idl")]
#[command(author, version, about)]
pub struct Args {
    /// Profile to archive (a leading @ is accepted)
    pub username: String,

    /// Session export file (Netscape cookies.txt or Cookie-Editor JSON)
    #[arg(long = "cookies", value_name = "PATH", default_value = DEFAULT_COOKIES_PATH)]
    pub cookies: PathBuf,

    /// Output root; files go under <output>/<username>/
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_ROOT)]
    pub output: PathBuf,

    /// User-Agent presented to the web root and the CDN
    #[arg(long, default_value = DEFAULT_USER_AGENT, hide_default_value = true)]
    pub user_agent: String,

    /// Timeout per query in seconds (1-3600)
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub query_timeout_secs: u64,

    /// Timeout per media retrieval in seconds (1-3600)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub retrieval_timeout_secs: u64,

    /// Lower bound of the randomized pause before each request, in milliseconds
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub pace_min_ms: u64,

    /// Upper bound of the randomized pause; 0 disables pacing
    #[arg(long, default_value_t = 750, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub pace_max_ms: u64,

    /// Only archive the timeline
    #[arg(long)]
    pub skip_highlights: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Converts parsed arguments into a run configuration.
    pub fn to_config(&self) -> Config {
        let mut config = Config::new(self.username.clone());
        config.cookies_path.clone_from(&self.cookies);
        config.output_root.clone_from(&self.output);
        config.user_agent.clone_from(&self.user_agent);
        config.query_timeout = Duration::from_secs(self.query_timeout_secs);
        config.retrieval_timeout = Duration::from_secs(self.retrieval_timeout_secs);
        config.pace_min = Duration::from_millis(self.pace_min_ms);
        config.pace_max = Duration::from_millis(self.pace_max_ms);
        config.skip_highlights = self.skip_highlights;
        config
    }
}
