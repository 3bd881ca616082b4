// crates/tool-bridge-core/src/runtime/mod.rs
// ============================================================================
// Module: Tool Bridge Runtime
// Description: Registry construction, authorization, normalization, and invocation.
// Purpose: Drive a tool request from lookup to normalized result.
// Dependencies: crate::{core, interfaces}, tokio, tokio-util, uuid
// ============================================================================

//! ## Overview
//! The runtime owns the request path: the immutable [`OperationRegistry`],
//! the [`AuthorizationPreFilter`], the [`normalize`] function, visibility
//! filtering, per-invocation scopes, and the [`ToolBridge`] facade that
//! strings them together. Every step that may wait is async and observes
//! the caller's cancellation token.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod authz;
pub mod bridge;
pub mod normalizer;
pub mod registry;
pub mod scope;
pub mod visibility;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authz::AllowReason;
pub use authz::AuthorizationPreFilter;
pub use authz::AuthzDecision;
pub use authz::AuthzError;
pub use authz::DenyReason;
pub use bridge::BridgeSettings;
pub use bridge::InvokeError;
pub use bridge::Invoked;
pub use bridge::ToolBridge;
pub use normalizer::normalize;
pub use registry::DiscoveryError;
pub use registry::OperationRegistry;
pub use registry::RegistryBuilder;
pub use registry::RegistryOptions;
pub use scope::InvocationScope;
pub use scope::ScopeClock;
pub use visibility::CallerIdentity;
pub use visibility::resolve_identity;
pub use visibility::visible_names;
