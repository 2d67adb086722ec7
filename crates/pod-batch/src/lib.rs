//! Named request queue for the pod client.
//!
//! A [`RequestBatcher`] runs one async action at a time. Calls that a merge
//! policy deems equivalent to a pending one share its outcome, and calls
//! with the same name are spaced at least one batch window apart. Each
//! resource owns one batcher, which is what keeps reads and writes against
//! that resource from interleaving.

pub mod batcher;
pub mod error;

pub use batcher::{
    merge_adjacent, merge_with_queued_tail, never_merge, MergeTarget, PendingCall,
    RequestBatcher, ANY_KEY,
};
pub use error::{BatchError, BatchResult};
