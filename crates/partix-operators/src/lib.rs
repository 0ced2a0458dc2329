#![forbid(unsafe_code)]
//! partix-operators: the stages of a partitioned pipeline.
//!
//! - `source`: splits an indexed source into contiguous or striped partitions.
//! - `sort_key`, `filter`, `map`: per-partition adapters (one pull in, one out).
//! - `repartition`: hash shuffle across partitions, unordered or key-ordered.
//! - `aggregate`: per-partition folds combined once on the caller.
//!
//! Everything here is synchronous and executor-agnostic; threads belong to
//! whoever implements `partix_core::executor::Executor`.

pub mod aggregate;
pub mod filter;
pub mod map;
pub mod repartition;
pub mod sort_key;
pub mod source;

pub use aggregate::{
    AggregationOptions, Count, CustomAggregate, InlinedAggregation, InlinedAggregationOperator,
    NullableAverage, NullableMinMax, NullableSum,
};
pub use filter::{filter_stream, Predicate};
pub use map::{map_stream, Projection};
pub use repartition::{HashKeySelector, HashRepartition, Hashed};
pub use sort_key::{sort_key_stream, KeySelector};
pub use source::{IndexedSource, ListPartitioner};
