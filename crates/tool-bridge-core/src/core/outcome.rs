// crates/tool-bridge-core/src/core/outcome.rs
// ============================================================================
// Module: Operation Return Shapes
// Description: Tagged union over every shape an operation may return.
// Purpose: Give the normalizer one exhaustive type to collapse.
// Dependencies: futures, serde, serde_json
// ============================================================================

//! ## Overview
//! Operations return direct values, deferred values, status-coded outcome
//! objects, or a dual-shape container that holds either a value or an
//! outcome. [`OperationReturn`] models all of them; the normalizer reduces
//! it to a [`NormalizedResult`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::operation::OperationError;

// ============================================================================
// SECTION: Status Outcomes
// ============================================================================

/// Status-coded outcome object.
///
/// # Invariants
/// - `payload: None` means the outcome has no payload slot.
/// - `payload: Some(Value::Null)` is a null payload in a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOutcome {
    /// Outcome kind name, used in marshalling failure messages.
    pub kind: String,
    /// HTTP-style status code.
    pub status: u16,
    /// Optional payload slot.
    pub payload: Option<Value>,
}

impl StatusOutcome {
    /// Builds an outcome with an explicit kind, status, and slot.
    #[must_use]
    pub fn new(kind: impl Into<String>, status: u16, payload: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            status,
            payload,
        }
    }

    /// `200 OK` carrying `payload`.
    #[must_use]
    pub fn ok(payload: Value) -> Self {
        Self::new("OkObjectResult", 200, Some(payload))
    }

    /// `201 Created` carrying `payload`.
    #[must_use]
    pub fn created(payload: Value) -> Self {
        Self::new("CreatedResult", 201, Some(payload))
    }

    /// `202 Accepted` carrying `payload`.
    #[must_use]
    pub fn accepted(payload: Value) -> Self {
        Self::new("AcceptedResult", 202, Some(payload))
    }

    /// `204 No Content` with no payload slot.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new("NoContentResult", 204, None)
    }

    /// `404 Not Found` with no payload slot.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new("NotFoundResult", 404, None)
    }

    /// `400 Bad Request` with no payload slot.
    #[must_use]
    pub fn bad_request() -> Self {
        Self::new("BadRequestResult", 400, None)
    }

    /// `401 Unauthorized` with no payload slot.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new("UnauthorizedResult", 401, None)
    }

    /// `403 Forbidden` with no payload slot.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new("ForbidResult", 403, None)
    }

    /// Bare status code with no payload slot.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::new("StatusCodeResult", status, None)
    }

    /// Arbitrary status code carrying `payload`.
    #[must_use]
    pub fn object(status: u16, payload: Value) -> Self {
        Self::new("ObjectResult", status, Some(payload))
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

// ============================================================================
// SECTION: Return Union
// ============================================================================

/// Dual-shape container: either a direct value or an embedded outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wrapped {
    /// Direct payload, possibly null.
    Direct(Value),
    /// Embedded status-coded outcome.
    Outcome(StatusOutcome),
}

/// Every shape an operation may return.
pub enum OperationReturn {
    /// Null return.
    Null,
    /// Bare value, passed through unchanged.
    Value(Value),
    /// Deferred value resolving to another return shape.
    Deferred(BoxFuture<'static, Result<Self, OperationError>>),
    /// Deferred void completion.
    DeferredUnit(BoxFuture<'static, Result<(), OperationError>>),
    /// Dual-shape container.
    Wrapped(Wrapped),
    /// Status-coded outcome object.
    Outcome(StatusOutcome),
}

impl OperationReturn {
    /// Wraps a future that resolves to another return shape.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Self, OperationError>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    /// Wraps a future with no payload.
    pub fn deferred_unit<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), OperationError>> + Send + 'static,
    {
        Self::DeferredUnit(future.boxed())
    }

    /// Returns the shape name for diagnostics.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Value(_) => "value",
            Self::Deferred(_) => "deferred",
            Self::DeferredUnit(_) => "deferred_unit",
            Self::Wrapped(_) => "wrapped",
            Self::Outcome(_) => "outcome",
        }
    }
}

impl fmt::Debug for OperationReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Wrapped(wrapped) => f.debug_tuple("Wrapped").field(wrapped).finish(),
            Self::Outcome(outcome) => f.debug_tuple("Outcome").field(outcome).finish(),
            other => f.write_str(other.shape()),
        }
    }
}

impl From<Value> for OperationReturn {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<StatusOutcome> for OperationReturn {
    fn from(outcome: StatusOutcome) -> Self {
        Self::Outcome(outcome)
    }
}

impl From<Wrapped> for OperationReturn {
    fn from(wrapped: Wrapped) -> Self {
        Self::Wrapped(wrapped)
    }
}

// ============================================================================
// SECTION: Normalized Result
// ============================================================================

/// Protocol-neutral result of normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedResult {
    /// Successful value. `present = false` marks a void completion.
    Value {
        /// Payload value (null for void).
        payload: Value,
        /// False only for void completions.
        present: bool,
    },
    /// A failure outcome reached the normalizer.
    MarshallingFailure {
        /// Kind name of the offending outcome.
        outcome_kind: String,
    },
}

impl NormalizedResult {
    /// Present value.
    #[must_use]
    pub const fn present(payload: Value) -> Self {
        Self::Value {
            payload,
            present: true,
        }
    }

    /// Void completion.
    #[must_use]
    pub const fn void() -> Self {
        Self::Value {
            payload: Value::Null,
            present: false,
        }
    }
}
