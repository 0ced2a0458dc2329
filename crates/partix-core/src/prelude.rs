//! Convenient re-exports for downstream crates.

pub use crate::cancel::{CancelPoll, CancellationToken};
pub use crate::config::EngineConfig;
pub use crate::enumerator::{Advance, BoxEnumerator, Fuse, IterEnumerator, PartitionEnumerator};
pub use crate::error::{Error, Result};
pub use crate::executor::{settle, Executor, Worker};
pub use crate::hash::{route, RouteHasher};
pub use crate::id::{QueryId, StageId};
pub use crate::merge::KWayMerge;
pub use crate::producer::{Producer, ProducerHeap};
pub use crate::stream::{KeyComparer, PartitionedStream};
