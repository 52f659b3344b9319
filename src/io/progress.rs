//! Window progress reporting shared by sequential and tiled runs

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives one notification per finished window
///
/// Workers of the tiled driver call into the same sink concurrently, so
/// implementations must be shareable across threads.
pub trait ProgressSink: Sync {
    /// A window has been evaluated or skipped
    fn window_completed(&self);
}

impl ProgressSink for () {
    fn window_completed(&self) {}
}

impl ProgressSink for AtomicUsize {
    fn window_completed(&self) {
        self.fetch_add(1, Ordering::Relaxed);
    }
}

impl ProgressSink for ProgressBar {
    fn window_completed(&self) {
        self.inc(1);
    }
}

static WINDOW_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    let template = format!(
        "[{{elapsed_precise}}] {{msg}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} windows"
    );
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Terminal progress display for a single reconstruction
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a visible bar expecting `windows` notifications
    pub fn new(windows: usize, label: &str) -> Self {
        let bar = ProgressBar::new(windows as u64);
        bar.set_style(WINDOW_STYLE.clone());
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Create a manager that counts but never draws
    pub fn hidden(windows: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(windows as u64);
        Self { bar }
    }

    /// Number of windows reported so far
    pub fn completed(&self) -> u64 {
        self.bar.position()
    }

    /// Close the display, leaving the final count on screen
    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl ProgressSink for ProgressManager {
    fn window_completed(&self) {
        self.bar.inc(1);
    }
}
