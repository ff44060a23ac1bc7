//! Specsafe Identifier Allocator
//!
//! Hands out the next unused sequential identifier for a namespace, safe
//! under concurrent callers in different threads and processes.
//!
//! # Algorithm
//!
//! ```text
//! lock <ns>/.id-counter.lock ──▶ read <ns>/.id-counter ──▶ +1 ──▶ atomic replace ──▶ unlock
//!                                     │ missing / corrupt
//!                                     ▼
//!                          scan <ns>/NNN-* for max (bootstrap / recovery only)
//! ```
//!
//! Lock acquisition waits a bounded time; a timeout is retried with
//! exponential backoff and then surfaced as `ErrorKind::Concurrency`.

#![warn(unreachable_pub)]

mod allocator;
mod scan;

pub use allocator::{
    format_id, AllocatorConfig, IdAllocator, COUNTER_FILE, COUNTER_LOCK_FILE,
};
pub use scan::highest_existing_id;
