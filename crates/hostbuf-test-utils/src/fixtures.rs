//! Reusable teardown fixtures.
//!
//! - [`ReleaseRecorder`]: shared event log for release logic and sinks.
//! - [`sequence`]: deterministic element data.

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared, ordered event log.
///
/// Clones share the same log. Hand [`release_fn`](ReleaseRecorder::release_fn)
/// to a transferred buffer and [`note`](ReleaseRecorder::note) from a
/// write-back sink to observe the order teardown steps run in.
#[derive(Clone, Debug, Default)]
pub struct ReleaseRecorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl ReleaseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn note(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// Release logic that records `"release <len>"`.
    pub fn release_fn<T: 'static>(&self) -> impl FnOnce(Vec<T>) + Send + 'static {
        let recorder = self.clone();
        move |data: Vec<T>| recorder.note(format!("release {}", data.len()))
    }

    /// Snapshot of the events so far.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

/// `0, 1, 2, …` as `i32`, `n` elements.
pub fn sequence(n: usize) -> Vec<i32> {
    (0..n as i32).collect()
}
