//! Tracing hooks.
//!
//! No telemetry stack is pulled in here; a binary wires `tracing` to whatever
//! subscriber it wants.

use partix_core::id::{QueryId, StageId};

#[cfg(feature = "tracing")]
pub fn emit_span(query: QueryId, stage: StageId, event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "partix", query = %query, stage = %stage);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_span(_query: QueryId, _stage: StageId, _event: &str, _key_values: &[(&str, String)]) {
}
