//! Progress and diagnostics observer for long export jobs.

/// Receives progress from the exporter. All methods default to no-ops, so
/// implementors only override what they display.
pub trait ProgressReporter {
    /// A layout with `total` cards is starting.
    fn reset(&mut self, _layout: &str, _total: usize) {}
    /// One card was placed.
    fn step(&mut self) {}
    fn layout_done(&mut self, _layout: &str) {}
    /// A non-fatal problem worth showing to the user.
    fn add_issue(&mut self, _issue: &str) {}
    /// Polled before every card; `true` stops the job before the next draw.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}

/// Forwards progress to the `log` facade.
#[derive(Debug, Default)]
pub struct LogReporter {
    layout: String,
    done: usize,
    total: usize,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for LogReporter {
    fn reset(&mut self, layout: &str, total: usize) {
        self.layout = layout.to_string();
        self.done = 0;
        self.total = total;
        log::info!("Exporting layout '{}' ({} cards)", layout, total);
    }

    fn step(&mut self) {
        self.done += 1;
        log::debug!("'{}': card {}/{}", self.layout, self.done, self.total);
    }

    fn layout_done(&mut self, layout: &str) {
        log::info!("Finished layout '{}'", layout);
    }

    fn add_issue(&mut self, issue: &str) {
        log::warn!("{}", issue);
    }
}
