#![forbid(unsafe_code)]
//! partix-core: shared substrate for partitioned parallel queries.
//!
//! Contents:
//! - the enumerator pull contract and `PartitionedStream`, the unit of
//!   composition between stages;
//! - `Producer`/`ProducerHeap` bookkeeping for order-key merges;
//! - cooperative cancellation, the routing hash, config, ids and errors;
//! - the `Executor` trait implemented by `partix-exec`.
//!
//! No threads, no I/O here.

pub mod cancel;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod executor;
pub mod hash;
pub mod id;
pub mod merge;
pub mod prelude;
pub mod producer;
pub mod stream;

pub use error::{Error, Result};
