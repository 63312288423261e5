mod event;
mod sink;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

pub use event::*;
pub use sink::*;

/// Unique identifier for a running extraction.
pub type OperationId = u64;

/// Shared handle to an event sink.
pub type EventSinkHandle = Arc<dyn EventSink>;

static NEXT_OP_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique [`OperationId`].
pub fn next_op_id() -> OperationId {
    NEXT_OP_ID.fetch_add(1, Ordering::Relaxed)
}
