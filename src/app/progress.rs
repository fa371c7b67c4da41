//! Per-section progress spinner (posts, highlights).

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Downloaded / failed counters for one section, optionally drawn as a spinner.
pub(crate) struct SectionProgress {
    label: &'static str,
    spinner: Option<ProgressBar>,
    downloaded: usize,
    failed: usize,
}

impl SectionProgress {
    /// Starts a section. With `use_spinner` false only the counters are kept.
    pub(crate) fn start(label: &'static str, use_spinner: bool) -> Self {
        let spinner = use_spinner.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        });
        let progress = Self {
            label,
            spinner,
            downloaded: 0,
            failed: 0,
        };
        progress.redraw();
        progress
    }

    pub(crate) fn record_downloaded(&mut self) {
        self.downloaded += 1;
        self.redraw();
    }

    pub(crate) fn record_failed(&mut self) {
        self.failed += 1;
        self.redraw();
    }

    #[cfg(test)]
    pub(crate) fn downloaded(&self) -> usize {
        self.downloaded
    }

    #[cfg(test)]
    pub(crate) fn failed(&self) -> usize {
        self.failed
    }

    /// Clears the spinner and logs the section totals.
    pub(crate) fn finish(self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
        info!(
            section = self.label,
            downloaded = self.downloaded,
            failed = self.failed,
            "section complete"
        );
    }

    fn redraw(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(format!(
                "{}: {} downloaded, {} failed",
                self.label, self.downloaded, self.failed
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SectionProgress;

    #[test]
    fn test_section_progress_without_spinner_counts() {
        let mut progress = SectionProgress::start("posts", false);
        progress.record_downloaded();
        progress.record_downloaded();
        progress.record_failed();
        assert_eq!(progress.downloaded(), 2);
        assert_eq!(progress.failed(), 1);
        progress.finish();
    }

    #[test]
    fn test_section_progress_with_spinner_finishes_cleanly() {
        let mut progress = SectionProgress::start("highlights", true);
        progress.record_failed();
        assert_eq!(progress.failed(), 1);
        progress.finish();
    }
}
