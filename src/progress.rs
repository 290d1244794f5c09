//! Optional progress reporting.
//!
//! Algorithms take a [`Progress`] handle through their `with_progress`
//! builder. The default handle discards events, so reporting costs nothing
//! unless a caller opts in.

use std::fmt;
use std::sync::Arc;

/// A progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A named phase of an algorithm started.
    Step {
        /// 1-based step number.
        step: usize,
        /// Total number of steps.
        of: usize,
        /// Short description of the phase.
        label: &'static str,
    },
    /// `done` of `total` items have been processed in the current phase.
    Processed {
        /// Items processed so far.
        done: usize,
        /// Items in the phase.
        total: usize,
    },
}

type Callback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Handle to a caller-supplied progress callback.
#[derive(Clone, Default)]
pub struct Progress {
    callback: Option<Callback>,
}

impl Progress {
    /// A handle that ignores every event.
    pub fn none() -> Self {
        Self::default()
    }

    /// Report events to `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(f)),
        }
    }

    /// Whether a callback is attached.
    pub fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn step(&self, step: usize, of: usize, label: &'static str) {
        self.emit(ProgressEvent::Step { step, of, label });
    }

    pub(crate) fn processed(&self, done: usize, total: usize) {
        self.emit(ProgressEvent::Processed { done, total });
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(cb) = &self.callback {
            cb(&event);
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
