#![forbid(unsafe_code)]
//! partix: partitioned, parallel pull pipelines.
//!
//! A source is split into N partitions, each a pull enumerator of
//! `(element, order key)` pairs. Stages adapt partitions one-to-one, hash
//! repartitioning shuffles elements across partitions behind a barrier, and
//! inlined aggregations fold each partition on its own worker before a single
//! sequential combine.
//!
//! ```no_run
//! use partix::prelude::*;
//!
//! let avg = Query::from_source(vec![Some(2i64), None, Some(4), Some(6)], EngineConfig::with_partitions(2))?
//!     .aggregate(NullableAverage)?;
//! assert_eq!(avg, Some(4.0));
//! # Ok::<(), partix::Error>(())
//! ```

pub use partix_core;
pub use partix_exec;
pub use partix_operators;

pub use partix_core::error::{Error, Result};

pub mod prelude {
    pub use partix_core::prelude::*;
    pub use partix_exec::{collect_ordered, collect_unordered, drain_partition, Query, ThreadExecutor};
    pub use partix_operators::aggregate::{
        AggregationOptions, Count, CustomAggregate, InlinedAggregation, InlinedAggregationOperator,
        NullableAverage, NullableMinMax, NullableSum,
    };
    pub use partix_operators::repartition::{HashRepartition, Hashed};
    pub use partix_operators::source::{IndexedSource, ListPartitioner};
}
