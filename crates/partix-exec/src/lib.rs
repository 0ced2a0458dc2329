#![forbid(unsafe_code)]
//! partix-exec: drives partitioned streams to completion.
//!
//! - `runtime`: a thread-per-partition [`Executor`](partix_core::executor::Executor)
//!   plus the drain/collect consumers (unordered concatenation, ordered merge).
//! - `query`: a small builder chaining source -> stages -> shuffle -> collect.
//! - `metrics`: tracing hooks keyed by query id.

pub mod metrics;
pub mod query;
pub mod runtime;

pub use query::Query;
pub use runtime::{collect_ordered, collect_unordered, drain_all, drain_partition, ThreadExecutor};
