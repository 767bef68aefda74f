use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::foundation::error::{GefxError, GefxResult};

const NO_REQUEST: usize = usize::MAX;

#[derive(Debug)]
struct Shared {
    request: AtomicUsize,
    selected: AtomicUsize,
    stop: AtomicBool,
    names: Vec<&'static str>,
}

/// Cloneable, thread-safe handle for steering a running [`crate::Engine`].
///
/// Requests are last-write-wins: the render loop consumes at most one per frame.
#[derive(Clone, Debug)]
pub struct EngineControl {
    shared: Arc<Shared>,
}

impl EngineControl {
    pub(crate) fn new(names: Vec<&'static str>, selected: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                request: AtomicUsize::new(NO_REQUEST),
                selected: AtomicUsize::new(selected),
                stop: AtomicBool::new(false),
                names,
            }),
        }
    }

    /// Number of registered effects.
    pub fn count(&self) -> usize {
        self.shared.names.len()
    }

    /// Index of the most recently selected effect (even if its init failed).
    pub fn selected(&self) -> usize {
        self.shared.selected.load(Ordering::Acquire)
    }

    /// Pending request, if any.
    pub fn pending(&self) -> Option<usize> {
        match self.shared.request.load(Ordering::Acquire) {
            NO_REQUEST => None,
            i => Some(i),
        }
    }

    fn request(&self, index: usize) {
        self.shared.request.store(index, Ordering::Release);
    }

    /// Request the effect after the current one, wrapping around.
    pub fn next(&self) {
        let n = self.count();
        if n == 0 {
            return;
        }
        self.request((self.selected() + 1) % n);
    }

    /// Request the effect before the current one, wrapping around.
    pub fn prev(&self) {
        let n = self.count();
        if n == 0 {
            return;
        }
        self.request((self.selected() + n - 1) % n);
    }

    /// Request a specific effect. Out-of-range indices are rejected and leave any pending
    /// request untouched.
    pub fn jump(&self, index: usize) -> GefxResult<()> {
        let n = self.count();
        if index >= n {
            tracing::warn!(index, count = n, "jump to unknown effect ignored");
            return Err(GefxError::validation(format!(
                "effect index {index} out of range (0..{n})"
            )));
        }
        self.request(index);
        Ok(())
    }

    /// `(index, name)` of every effect.
    pub fn list(&self) -> Vec<(usize, &'static str)> {
        self.shared.names.iter().copied().enumerate().collect()
    }

    /// Ask the render loop to stop after the current frame.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// `true` once `stop` has been called.
    pub fn stop_requested(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    /// Consume the pending request and record it as selected.
    pub(crate) fn take_request(&self) -> Option<usize> {
        match self.shared.request.swap(NO_REQUEST, Ordering::AcqRel) {
            NO_REQUEST => None,
            i => {
                self.shared.selected.store(i, Ordering::Release);
                Some(i)
            }
        }
    }
}
