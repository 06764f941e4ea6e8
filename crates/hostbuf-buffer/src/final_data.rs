//! Write-back policy: where a modified buffer's contents go at teardown.
//!
//! [`FinalData`] names the destination; the buffer turns it into a
//! one-shot [`WriteBack`] that the destruction sequence fires at most
//! once, and only if the buffer was modified.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use hostbuf_core::BufferId;

use crate::storage::{SharedHostData, Storage};

/// Destination for the write-back performed at buffer teardown.
pub enum FinalData<'a, T> {
    /// No write-back. Clears any previous configuration.
    None,
    /// Copy into the referent if it is still alive; skip silently otherwise.
    Weak(Weak<Mutex<Vec<T>>>),
    /// Copy into the referent, keeping it alive until teardown.
    Shared(SharedHostData<T>),
    /// Copy into a borrowed destination slice.
    Slice(&'a mut [T]),
    /// Hand the final contents to a caller-supplied sink.
    Sink(Box<dyn FnOnce(&[T]) + Send + 'a>),
}

impl<'a, T> FinalData<'a, T> {
    /// Wrap a sink closure.
    pub fn sink(f: impl FnOnce(&[T]) + Send + 'a) -> Self {
        Self::Sink(Box::new(f))
    }

    fn kind(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Weak(_) => Some("weak"),
            Self::Shared(_) => Some("shared"),
            Self::Slice(_) => Some("slice"),
            Self::Sink(_) => Some("sink"),
        }
    }
}

impl<T> fmt::Debug for FinalData<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().unwrap_or("none"))
    }
}

impl<T> From<Weak<Mutex<Vec<T>>>> for FinalData<'_, T> {
    fn from(w: Weak<Mutex<Vec<T>>>) -> Self {
        Self::Weak(w)
    }
}

impl<T> From<SharedHostData<T>> for FinalData<'_, T> {
    fn from(s: SharedHostData<T>) -> Self {
        Self::Shared(s)
    }
}

impl<'a, T> From<&'a mut [T]> for FinalData<'a, T> {
    fn from(s: &'a mut [T]) -> Self {
        Self::Slice(s)
    }
}

impl<'a, T> From<Option<SharedHostData<T>>> for FinalData<'a, T> {
    fn from(s: Option<SharedHostData<T>>) -> Self {
        s.map_or(Self::None, Self::Shared)
    }
}

/// What a fired write-back actually did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteBackOutcome {
    /// This many elements were copied out, in storage order.
    Copied(usize),
    /// The weak destination had already been released.
    TargetReleased,
    /// The destination is the shared allocation the buffer aliases.
    InPlace,
}

type WriteBackFn<'a, T> =
    Box<dyn FnOnce(&Storage<'a, T>, BufferId) -> WriteBackOutcome + Send + 'a>;

/// A configured, not yet fired, write-back.
pub(crate) struct WriteBack<'a, T> {
    kind: &'static str,
    action: WriteBackFn<'a, T>,
}

impl<'a, T> WriteBack<'a, T> {
    /// Build the write-back for `target`, or `None` when it disables write-back.
    pub(crate) fn new(target: FinalData<'a, T>) -> Option<Self>
    where
        T: Clone + Send + 'a,
    {
        let kind = target.kind()?;
        let action: WriteBackFn<'a, T> = match target {
            FinalData::None => return None,
            FinalData::Weak(weak) => Box::new(move |storage: &Storage<'a, T>, id: BufferId| match weak.upgrade() {
                Some(dst) => copy_to_shared(storage, &dst, id),
                None => WriteBackOutcome::TargetReleased,
            }),
            FinalData::Shared(dst) => {
                Box::new(move |storage: &Storage<'a, T>, id: BufferId| {
                    copy_to_shared(storage, &dst, id)
                })
            }
            FinalData::Slice(dst) => Box::new(move |storage: &Storage<'a, T>, id: BufferId| {
                storage.with_slice(|src| copy_prefix(src, dst, id))
            }),
            FinalData::Sink(sink) => Box::new(move |storage: &Storage<'a, T>, _: BufferId| {
                storage.with_slice(|src| {
                    sink(src);
                    WriteBackOutcome::Copied(src.len())
                })
            }),
        };
        Some(Self { kind, action })
    }

    pub(crate) fn kind(&self) -> &'static str {
        self.kind
    }

    /// Run the write-back against `storage`. Consumes it: fires once.
    pub(crate) fn fire(self, storage: &Storage<'a, T>, id: BufferId) -> WriteBackOutcome {
        (self.action)(storage, id)
    }
}

fn copy_to_shared<T: Clone>(
    storage: &Storage<'_, T>,
    dst: &SharedHostData<T>,
    id: BufferId,
) -> WriteBackOutcome {
    if storage
        .shared_handle()
        .is_some_and(|src| Arc::ptr_eq(src, dst))
    {
        return WriteBackOutcome::InPlace;
    }
    storage.with_slice(|src| copy_prefix(src, &mut dst.lock(), id))
}

/// Copy `src` into `dst` element by element. Copies the overlapping
/// prefix when the lengths disagree.
fn copy_prefix<T: Clone>(src: &[T], dst: &mut [T], id: BufferId) -> WriteBackOutcome {
    if src.len() != dst.len() {
        tracing::warn!(
            buffer = %id,
            source_len = src.len(),
            destination_len = dst.len(),
            "write-back destination length differs from buffer; copying overlap"
        );
    }
    let n = src.len().min(dst.len());
    dst[..n].clone_from_slice(&src[..n]);
    WriteBackOutcome::Copied(n)
}
