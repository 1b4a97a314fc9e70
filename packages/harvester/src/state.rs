//! Run flag and progress reporting shared between a pipeline loop and its
//! controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Running/stopped flag polled by a loop between units of work.
///
/// Clones share the same flag. The controller is the only writer of
/// `Running`; the loop itself only ever writes `Stopped`.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    running: Arc<AtomicBool>,
}

impl PipelineState {
    /// A state that starts out `Stopped`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A state that starts out `Running`.
    pub fn running() -> Self {
        let state = Self::new();
        state.start();
        state
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Answer of a progress sink to a progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    Continue,
    /// Stop at this boundary and checkpoint.
    Abort,
}

impl ProgressSignal {
    #[must_use]
    pub fn is_abort(self) -> bool {
        self == Self::Abort
    }
}

/// Receives progress from a pipeline loop.
///
/// Called synchronously on the loop's task, so implementations must return
/// promptly. The value is a cumulative record count for fetching and a
/// percentage in `0..=100` for classification.
pub trait ProgressSink: Send + Sync {
    fn report(&self, value: f64) -> ProgressSignal;
}

impl<F> ProgressSink for F
where
    F: Fn(f64) -> ProgressSignal + Send + Sync,
{
    fn report(&self, value: f64) -> ProgressSignal {
        self(value)
    }
}

/// Sink that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _value: f64) -> ProgressSignal {
        ProgressSignal::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_state_transitions() {
        let state = PipelineState::new();
        assert!(!state.is_running());

        state.start();
        assert!(state.is_running());

        state.stop();
        assert!(!state.is_running());
    }

    #[test]
    fn test_clones_share_flag() {
        let state = PipelineState::running();
        let seen_by_loop = state.clone();
        state.stop();
        assert!(!seen_by_loop.is_running());
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |value: f64| {
            seen.lock().unwrap().push(value);
            if value >= 2.0 {
                ProgressSignal::Abort
            } else {
                ProgressSignal::Continue
            }
        };

        assert_eq!(sink.report(1.0), ProgressSignal::Continue);
        assert!(sink.report(2.0).is_abort());
        assert_eq!(*seen.lock().unwrap(), vec![1.0, 2.0]);
    }
}
