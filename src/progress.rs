//! Progress aggregation
//!
//! Maps the pipeline phases onto disjoint slices of the unit interval and
//! funnels `(fraction, label)` updates through one reporter that guarantees
//! monotonic non-decreasing fractions clamped to `[0, 1]` for the whole run.

/// Fraction at which the character fetch phase ends
pub const CHARACTER_DONE: f64 = 0.2;
/// Fraction at which the linklists fetch phase ends
pub const LINKLISTS_DONE: f64 = 0.4;
/// Fraction at which the per-link-type fetch phase ends
pub const LINKS_DONE: f64 = 0.6;
/// Fraction at which the notes fetch phase ends
pub const NOTES_DONE: f64 = 0.8;

/// Callback invoked with `(fraction, label)` on each phase update
pub type ProgressCallback = Box<dyn FnMut(f64, &str) + Send>;

/// Reporter enforcing the progress invariants for one export run
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: f64,
}

impl ProgressReporter {
    /// Wrap an optional caller-supplied callback
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    /// Emit one update. The fraction is clamped to `[0, 1]` and never
    /// decreases across the run, regardless of what the phases compute.
    pub fn emit(&mut self, fraction: f64, label: &str) {
        let fraction = fraction.clamp(0.0, 1.0).max(self.last);
        self.last = fraction;
        tracing::debug!(fraction, label, "export progress");
        if let Some(callback) = self.callback.as_mut() {
            callback(fraction, label);
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting_reporter() -> (ProgressReporter, Arc<Mutex<Vec<(f64, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::new(Some(Box::new(move |fraction, label| {
            sink.lock().unwrap().push((fraction, label.to_string()));
        })));
        (reporter, seen)
    }

    #[test]
    fn fractions_never_decrease() {
        let (mut reporter, seen) = collecting_reporter();
        reporter.emit(0.2, "a");
        reporter.emit(0.1, "b");
        reporter.emit(0.6, "c");

        let fractions: Vec<f64> = seen.lock().unwrap().iter().map(|(f, _)| *f).collect();
        assert_eq!(fractions, vec![0.2, 0.2, 0.6]);
    }

    #[test]
    fn fractions_are_clamped_to_unit_interval() {
        let (mut reporter, seen) = collecting_reporter();
        reporter.emit(-0.5, "low");
        reporter.emit(1.7, "high");

        let fractions: Vec<f64> = seen.lock().unwrap().iter().map(|(f, _)| *f).collect();
        assert_eq!(fractions, vec![0.0, 1.0]);
    }

    #[test]
    fn absent_callback_is_a_noop() {
        let mut reporter = ProgressReporter::new(None);
        reporter.emit(0.5, "quiet");
    }
}
