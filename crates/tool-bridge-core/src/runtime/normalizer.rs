// crates/tool-bridge-core/src/runtime/normalizer.rs
// ============================================================================
// Module: Result Normalizer
// Description: Collapses operation return shapes into a value-or-failure result.
// Purpose: Give the protocol layer one result contract regardless of return shape.
// Dependencies: crate::core, tokio, tokio-util
// ============================================================================

//! ## Overview
//! [`normalize`] walks an [`OperationReturn`] iteratively. Deferred values
//! are awaited (cancellably) and their resolution is fed back into the
//! loop; dual-shape containers unwrap to their value or their embedded
//! outcome; status outcomes succeed only with a 2xx status and a payload
//! slot.
//!
//! ## Invariants
//! - A failure outcome is never turned into a value.
//! - A void completion is `present = false`, distinct from a null value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::NormalizedResult;
use crate::core::OperationError;
use crate::core::OperationReturn;
use crate::core::StatusOutcome;
use crate::core::Wrapped;

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes a raw operation return.
///
/// # Errors
///
/// Returns [`OperationError`] when a deferred value fails or the token is
/// cancelled while waiting on one.
pub async fn normalize(
    raw: OperationReturn,
    cancel: &CancellationToken,
) -> Result<NormalizedResult, OperationError> {
    let mut current = raw;
    loop {
        current = match current {
            OperationReturn::Null => return Ok(NormalizedResult::present(Value::Null)),
            OperationReturn::Value(value) | OperationReturn::Wrapped(Wrapped::Direct(value)) => {
                return Ok(NormalizedResult::present(value));
            }
            OperationReturn::DeferredUnit(pending) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(OperationError::Cancelled),
                    resolved = pending => resolved?,
                }
                return Ok(NormalizedResult::void());
            }
            OperationReturn::Deferred(pending) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(OperationError::Cancelled),
                    resolved = pending => resolved?,
                }
            }
            OperationReturn::Wrapped(Wrapped::Outcome(outcome)) => {
                OperationReturn::Outcome(outcome)
            }
            OperationReturn::Outcome(outcome) => return Ok(unwrap_outcome(outcome)),
        };
    }
}

/// Converts a status outcome into a normalized result.
fn unwrap_outcome(outcome: StatusOutcome) -> NormalizedResult {
    if !outcome.is_success() {
        return NormalizedResult::MarshallingFailure {
            outcome_kind: outcome.kind,
        };
    }
    match outcome.payload {
        Some(payload) => NormalizedResult::present(payload),
        None => NormalizedResult::MarshallingFailure {
            outcome_kind: outcome.kind,
        },
    }
}
