//! Host-side buffers with ownership policies, copy-on-write, and
//! deferred write-back.
//!
//! A [`Buffer`] is a logical `D`-dimensional array whose storage is
//! either runtime-owned or borrowed from the caller under one of five
//! aliasing policies. Access intent is tracked per accessor; the first
//! write-capable access to read-only caller memory switches the buffer
//! to a private copy. When the last holder goes away, modified contents
//! are written back to the configured destination before the storage is
//! released.
//!
//! # Architecture
//!
//! ```text
//! Buffer (holder handle, Clone = +1 holder)
//! └── Arc<BufferCore>
//!     ├── holders: AtomicUsize ──▶ 0 triggers the destruction sequence
//!     ├── Mutex<BufferState>
//!     │   ├── Storage (Owned | HostWritable | HostReadOnly | Shared | Transferred)
//!     │   ├── modified flag (monotonic)
//!     │   ├── WriteBack (one-shot, from FinalData)
//!     │   ├── DestructorPromise ──▶ DestructorFuture (waiter side)
//!     │   └── latest producer task
//!     └── Arc<BufferStats>
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod accessor;
pub mod buffer;
pub mod builder;
pub mod config;
pub mod destructor;
pub mod final_data;
pub mod stats;
pub mod storage;
pub mod waiter;

// Public re-exports for the primary API surface.
pub use accessor::HostAccessor;
pub use buffer::{Buffer, SELF_HOLDER_THRESHOLD};
pub use builder::BufferBuilder;
pub use config::{BufferConfig, ConfigError};
pub use destructor::DestructorFuture;
pub use final_data::{FinalData, WriteBackOutcome};
pub use stats::{BufferStats, Lifecycle};
pub use storage::{shared_host_data, OwnershipMode, ReleaseFn, SharedHostData};
pub use waiter::BufferWaiter;
