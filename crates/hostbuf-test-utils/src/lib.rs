//! Test utilities and mock types for hostbuf development.
//!
//! Provides a mock scheduler ([`MockTask`], [`MockTaskHandler`]) for
//! exercising the buffer/task seam, and fixtures for observing teardown
//! order ([`ReleaseRecorder`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hostbuf_core::{Retained, TaskHandler, TaskId, TaskNode, TaskRef};
use indexmap::IndexMap;
use smallvec::SmallVec;

pub use fixtures::ReleaseRecorder;

/// Mock implementation of [`TaskNode`] with a settable completion flag.
#[derive(Debug)]
pub struct MockTask {
    id: TaskId,
    complete: AtomicBool,
}

impl MockTask {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: TaskId(id),
            complete: AtomicBool::new(false),
        })
    }

    pub fn mark_complete(&self) {
        self.complete.store(true, Ordering::Release);
    }
}

impl TaskNode for MockTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

/// Mock implementation of [`TaskHandler`].
///
/// Records every prerequisite edge as `(task, producer)` and keeps
/// retained resources per task until [`complete`](MockTaskHandler::complete)
/// is called, mimicking a scheduler that releases a task's resources
/// when it finishes.
pub struct MockTaskHandler<'a> {
    task: Arc<MockTask>,
    prerequisites: SmallVec<[(TaskId, TaskId); 4]>,
    retained: IndexMap<TaskId, Vec<Retained<'a>>>,
}

impl<'a> MockTaskHandler<'a> {
    /// Handler building a fresh task with id `id`.
    pub fn new(id: u64) -> Self {
        Self::for_task(MockTask::new(id))
    }

    /// Handler building an existing task.
    pub fn for_task(task: Arc<MockTask>) -> Self {
        Self {
            task,
            prerequisites: SmallVec::new(),
            retained: IndexMap::new(),
        }
    }

    /// The task node being built.
    pub fn task_node(&self) -> Arc<MockTask> {
        Arc::clone(&self.task)
    }

    /// Recorded prerequisite edges, in insertion order.
    pub fn prerequisites(&self) -> Vec<(TaskId, TaskId)> {
        self.prerequisites.to_vec()
    }

    /// Number of resources currently retained across all tasks.
    pub fn retained_count(&self) -> usize {
        self.retained.values().map(Vec::len).sum()
    }

    /// Mark the task complete and drop everything it retained.
    pub fn complete(&mut self) {
        self.task.mark_complete();
        self.retained.clear();
    }
}

impl<'a> TaskHandler<'a> for MockTaskHandler<'a> {
    fn task(&self) -> TaskRef {
        self.task.clone()
    }

    fn add_prerequisite(&mut self, task: &TaskRef, producer: &TaskRef) {
        self.prerequisites.push((task.id(), producer.id()));
    }

    fn retain(&mut self, task: &TaskRef, resource: Retained<'a>) {
        self.retained.entry(task.id()).or_default().push(resource);
    }
}
