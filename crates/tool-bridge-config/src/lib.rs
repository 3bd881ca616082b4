// crates/tool-bridge-config/src/lib.rs
// ============================================================================
// Module: Tool Bridge Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for tool-bridge.toml semantics.
// Dependencies: tool-bridge-core, serde, toml
// ============================================================================

//! ## Overview
//! `tool-bridge-config` defines the configuration model for the Tool
//! Bridge server: transport, caller authentication, audit logging, the
//! module set to expose, the output naming convention, and the policy set.
//! Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
