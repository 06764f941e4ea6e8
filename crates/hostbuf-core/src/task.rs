//! The seam between buffers and an external task-graph scheduler.
//!
//! The scheduler owns tasks and decides when they run. A buffer only
//! needs three things from it: the task currently being built, a way to
//! order that task after the buffer's last producer, and somewhere to
//! park a keep-alive holder until the task completes.

use std::fmt;
use std::sync::Arc;

use crate::id::TaskId;

/// A node in the scheduler's task graph, as seen by a buffer.
pub trait TaskNode: Send + Sync + fmt::Debug {
    /// Stable identifier of this task.
    fn id(&self) -> TaskId;

    /// Whether the task has finished executing.
    ///
    /// A completed producer imposes no ordering on later tasks.
    fn is_complete(&self) -> bool;
}

/// Shared handle to a scheduled task.
pub type TaskRef = Arc<dyn TaskNode>;

/// Opaque keep-alive token a task retains until it completes.
///
/// Buffers hand the scheduler one of their holders through this type;
/// dropping it releases the holder.
pub type Retained<'a> = Box<dyn Send + 'a>;

/// Command-group handler through which a buffer registers itself as a
/// dependency of a task.
pub trait TaskHandler<'a> {
    /// The task this handler is building.
    fn task(&self) -> TaskRef;

    /// Order `task` after `producer`.
    fn add_prerequisite(&mut self, task: &TaskRef, producer: &TaskRef);

    /// Keep `resource` alive until `task` completes.
    fn retain(&mut self, task: &TaskRef, resource: Retained<'a>);
}
