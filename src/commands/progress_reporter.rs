use crate::store::StoreObserver;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Refresh rate for progress updates (10 Hz).
const REFRESH_INTERVAL_MS: u64 = 100;

const TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {msg}";
const TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {msg}";

#[derive(Debug)]
struct ProgressState {
    visible_after: Instant,
    visible: AtomicBool,
    files_done: AtomicU64,
    files_total: AtomicU64,
    writes_done: AtomicU64,
    writes_total: AtomicU64,
}

/// A progress bar over files processed and writes landed, shown only once work runs past a delay.
///
/// The store notifies it through [`StoreObserver`] from whichever thread drives the store; a
/// background task polls the counters and redraws.
pub struct ProgressReporter {
    bar: ProgressBar,
    state: Arc<ProgressState>,
    refresh_task: JoinHandle<()>,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    ///
    /// Must be called from within a Tokio runtime. When `use_colors` is false, the bar is
    /// rendered without ANSI styling.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_draw_target(ProgressDrawTarget::hidden());

        let template = if use_colors { TEMPLATE } else { TEMPLATE_NO_COLOR };
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            bar.set_style(style.progress_chars("=> "));
        }

        let state = Arc::new(ProgressState {
            visible_after: Instant::now() + delay,
            visible: AtomicBool::new(false),
            files_done: AtomicU64::new(0),
            files_total: AtomicU64::new(0),
            writes_done: AtomicU64::new(0),
            writes_total: AtomicU64::new(0),
        });

        Self {
            refresh_task: tokio::spawn(refresh_task(bar.clone(), Arc::clone(&state))),
            bar,
            state,
        }
    }

    /// Set the prefix label for the progress bar (e.g., "Opening", "Ingesting").
    pub fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
        self.state.files_done.store(0, Ordering::Relaxed);
        self.state.files_total.store(0, Ordering::Relaxed);
    }

    /// Finish and clear the progress indicator.
    pub fn done(&self) {
        self.refresh_task.abort();
        if self.state.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl StoreObserver for ProgressReporter {
    fn writes_completed(&self, completed: u64, total: u64) {
        self.state.writes_done.store(completed, Ordering::Relaxed);
        self.state.writes_total.store(total, Ordering::Relaxed);
    }

    fn files_processed(&self, completed: u64, total: u64) {
        self.state.files_done.store(completed, Ordering::Relaxed);
        self.state.files_total.store(total, Ordering::Relaxed);
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("state", &self.state)
            .field("refresh_task", &"<task>")
            .finish()
    }
}

/// Background refresh task that periodically updates the progress bar.
async fn refresh_task(bar: ProgressBar, state: Arc<ProgressState>) {
    let mut interval = tokio::time::interval(Duration::from_millis(REFRESH_INTERVAL_MS));
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !state.visible.load(Ordering::Relaxed) && Instant::now() >= state.visible_after {
            state.visible.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        if state.visible.load(Ordering::Relaxed) {
            let files_total = state.files_total.load(Ordering::Relaxed);
            let files_done = state.files_done.load(Ordering::Relaxed);
            let writes_total = state.writes_total.load(Ordering::Relaxed);
            let writes_done = state.writes_done.load(Ordering::Relaxed);

            if files_total > 0 {
                bar.set_length(files_total);
                bar.set_position(files_done);
            }
            bar.set_message(format!("{files_done}/{files_total} files, {writes_done}/{writes_total} writes"));
        }
    }
}
