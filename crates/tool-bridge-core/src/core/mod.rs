// crates/tool-bridge-core/src/core/mod.rs
// ============================================================================
// Module: Tool Bridge Core Types
// Description: Operation metadata, role hierarchy, naming, and return shapes.
// Purpose: Provide stable types shared by registry, pre-filter, and protocol layers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types describe what an operation is (its declared requirements, its
//! invoker, its canonical name) and what it may return. They are the single
//! source of truth for every derived protocol surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod naming;
pub mod operation;
pub mod outcome;
pub mod requirement;
pub mod roles;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use naming::FieldCollision;
pub use naming::NamingConvention;
pub use naming::canonicalize;
pub use naming::rename_fields;
pub use naming::split_words;
pub use operation::GroupSpec;
pub use operation::Invoker;
pub use operation::OperationCall;
pub use operation::OperationDescriptor;
pub use operation::OperationError;
pub use operation::OperationFuture;
pub use operation::OperationSpec;
pub use outcome::NormalizedResult;
pub use outcome::OperationReturn;
pub use outcome::StatusOutcome;
pub use outcome::Wrapped;
pub use requirement::AuthorizationRequirement;
pub use requirement::RequirementError;
pub use roles::MinimumRole;
pub use roles::PolicyRoleMap;
pub use roles::RoleLevel;
pub use roles::UnknownRoleError;
