// crates/tool-bridge-core/src/core/operation.rs
// ============================================================================
// Module: Operation Metadata
// Description: Registration specs, invokers, and immutable operation descriptors.
// Purpose: Describe host operations explicitly instead of scanning types at runtime.
// Dependencies: futures, serde, serde_json, thiserror, tokio-util
// ============================================================================

//! ## Overview
//! Hosts describe operations with [`GroupSpec`] and [`OperationSpec`]
//! builders. Groups play the part of a declaring type: their requirement
//! and anonymous markers are inherited by every operation they contain.
//! The registry turns specs into immutable [`OperationDescriptor`]s.
//!
//! Invokers come in two forms. A static invoker runs directly. A bound
//! invoker first activates a fresh instance for the invocation scope and
//! then runs its method on that instance; activation only happens once the
//! pre-filter has allowed the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::outcome::OperationReturn;
use crate::core::requirement::AuthorizationRequirement;
use crate::core::roles::MinimumRole;
use crate::interfaces::CallerContext;
use crate::runtime::scope::InvocationScope;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure raised by an operation body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Arguments did not match the operation's input shape.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// Operation failed.
    #[error("operation failed: {0}")]
    Failed(String),
    /// Operation observed cancellation.
    #[error("operation cancelled")]
    Cancelled,
}

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// Boxed future returned by invokers.
pub type OperationFuture = BoxFuture<'static, Result<OperationReturn, OperationError>>;

/// Per-invocation input handed to an operation body.
#[derive(Debug, Clone)]
pub struct OperationCall {
    /// Raw JSON arguments.
    pub arguments: Value,
    /// Caller context for this request.
    pub caller: CallerContext,
    /// Cancellation token for this invocation.
    pub cancel: CancellationToken,
    /// Isolated scope created for this invocation.
    pub scope: InvocationScope,
}

impl OperationCall {
    /// Deserializes the arguments into `T`.
    ///
    /// Null arguments are treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidArguments`] when decoding fails.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, OperationError> {
        let arguments = if self.arguments.is_null() { json!({}) } else { self.arguments.clone() };
        serde_json::from_value(arguments)
            .map_err(|err| OperationError::InvalidArguments(err.to_string()))
    }
}

/// Type-erased operation body.
type ErasedBody = dyn Fn(OperationCall) -> OperationFuture + Send + Sync;

/// Callable reference to an operation body.
#[derive(Clone)]
pub enum Invoker {
    /// Runs without an activated instance.
    Static(Arc<ErasedBody>),
    /// Activates an instance from the invocation scope, then runs a method on it.
    Bound(Arc<ErasedBody>),
}

impl Invoker {
    /// Builds a static invoker from an async function.
    pub fn function<F, Fut>(body: F) -> Self
    where
        F: Fn(OperationCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OperationReturn, OperationError>> + Send + 'static,
    {
        Self::Static(Arc::new(move |call| body(call).boxed()))
    }

    /// Builds a bound invoker from an activator and a method.
    ///
    /// `activate` runs once per invocation, after authorization, with the
    /// invocation's fresh scope.
    pub fn bound<T, A, M, Fut>(activate: A, method: M) -> Self
    where
        T: Send + 'static,
        A: Fn(&InvocationScope) -> T + Send + Sync + 'static,
        M: Fn(T, OperationCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OperationReturn, OperationError>> + Send + 'static,
    {
        Self::Bound(Arc::new(move |call: OperationCall| {
            let instance = activate(&call.scope);
            method(instance, call).boxed()
        }))
    }

    /// Returns true for static invokers.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    /// Runs the operation body.
    #[must_use]
    pub fn call(&self, call: OperationCall) -> OperationFuture {
        match self {
            Self::Static(body) | Self::Bound(body) => body(call),
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("Invoker::Static"),
            Self::Bound(_) => f.write_str("Invoker::Bound"),
        }
    }
}

// ============================================================================
// SECTION: Registration Specs
// ============================================================================

/// Registration entry for a single operation.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    /// Declared identifier, canonicalized into the tool name.
    pub identifier: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for arguments.
    pub input_schema: Value,
    /// Operation-level requirements.
    pub requirements: Vec<AuthorizationRequirement>,
    /// Operation-level anonymous marker.
    pub allow_anonymous: bool,
    /// Exposed-as-tool marker.
    pub exposed: bool,
    /// Operation body.
    pub invoker: Invoker,
}

impl OperationSpec {
    /// Creates an exposed operation with an empty object schema.
    #[must_use]
    pub fn new(identifier: impl Into<String>, invoker: Invoker) -> Self {
        Self {
            identifier: identifier.into(),
            description: String::new(),
            input_schema: json!({"type": "object", "properties": {}}),
            requirements: Vec::new(),
            allow_anonymous: false,
            exposed: true,
            invoker,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Appends a requirement.
    #[must_use]
    pub fn require(mut self, requirement: AuthorizationRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Marks the operation as anonymous.
    #[must_use]
    pub fn allow_anonymous(mut self) -> Self {
        self.allow_anonymous = true;
        self
    }

    /// Removes the exposed-as-tool marker.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.exposed = false;
        self
    }
}

/// Registration entry for a group of operations sharing markers.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    /// Group (module) name.
    pub name: String,
    /// Exposed-as-tool marker for the group.
    pub exposed: bool,
    /// Requirements inherited by every operation.
    pub requirements: Vec<AuthorizationRequirement>,
    /// Anonymous marker inherited by every operation.
    pub allow_anonymous: bool,
    /// Operations in declaration order.
    pub operations: Vec<OperationSpec>,
}

impl GroupSpec {
    /// Creates an exposed group with no markers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exposed: true,
            requirements: Vec::new(),
            allow_anonymous: false,
            operations: Vec::new(),
        }
    }

    /// Appends a group-level requirement.
    #[must_use]
    pub fn require(mut self, requirement: AuthorizationRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Marks every operation in the group as anonymous.
    #[must_use]
    pub fn allow_anonymous(mut self) -> Self {
        self.allow_anonymous = true;
        self
    }

    /// Removes the exposed-as-tool marker from the group.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.exposed = false;
        self
    }

    /// Appends an operation.
    #[must_use]
    pub fn operation(mut self, operation: OperationSpec) -> Self {
        self.operations.push(operation);
        self
    }
}

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Immutable catalog entry built at registry construction.
///
/// # Invariants
/// - `name` is unique within a registry.
/// - `requirements` lists operation-level entries before group-level ones.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Canonical tool name.
    pub name: String,
    /// Declared identifier.
    pub identifier: String,
    /// Declaring group name.
    pub group: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for arguments.
    pub input_schema: Value,
    /// True when the invoker needs no activation.
    pub is_static: bool,
    /// Collected requirements.
    pub requirements: Vec<AuthorizationRequirement>,
    /// Anonymous override, from the operation or its group.
    pub allow_anonymous: bool,
    /// Listing classification.
    pub minimum_role: MinimumRole,
    /// Operation body.
    pub invoker: Invoker,
}
