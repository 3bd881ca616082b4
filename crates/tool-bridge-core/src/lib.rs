// crates/tool-bridge-core/src/lib.rs
// ============================================================================
// Module: Tool Bridge Core Library
// Description: Public API surface for the Tool Bridge core.
// Purpose: Expose operation metadata, oracle interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Tool Bridge core exposes host-defined operations through a remote tool
//! protocol while preserving the authorization requirements declared on them.
//! It owns four concerns: registration of invokable operations, a
//! pre-invocation authorization gate, normalization of heterogeneous return
//! shapes, and role-based catalog visibility. It is transport-agnostic and
//! delegates every truth decision to host-supplied oracles.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AuthOracle;
pub use interfaces::CallerContext;
pub use interfaces::OracleError;
pub use interfaces::RoleResolver;
pub use runtime::AllowReason;
pub use runtime::AuthorizationPreFilter;
pub use runtime::AuthzDecision;
pub use runtime::AuthzError;
pub use runtime::BridgeSettings;
pub use runtime::CallerIdentity;
pub use runtime::DenyReason;
pub use runtime::DiscoveryError;
pub use runtime::InvocationScope;
pub use runtime::InvokeError;
pub use runtime::Invoked;
pub use runtime::OperationRegistry;
pub use runtime::RegistryBuilder;
pub use runtime::RegistryOptions;
pub use runtime::ScopeClock;
pub use runtime::ToolBridge;
pub use runtime::normalize;
pub use runtime::resolve_identity;
pub use runtime::visible_names;
