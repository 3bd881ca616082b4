// crates/tool-bridge-cli/src/lib.rs
// ============================================================================
// Module: Tool Bridge CLI Library
// Description: Shared helpers for the Tool Bridge command-line interface.
// Purpose: Build the sample host registry and render catalog listings.
// Dependencies: tool-bridge-core, tool-bridge-config, serde
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) wires configuration, the sample
//! host module, and the MCP server together. Registry construction and
//! catalog rendering live here so integration tests can reach them.
//!
//! Security posture: CLI inputs are untrusted and must be validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Sample in-memory host module.
pub mod users;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use tool_bridge_config::ToolBridgeConfig;
use tool_bridge_core::DiscoveryError;
use tool_bridge_core::MinimumRole;
use tool_bridge_core::OperationDescriptor;
use tool_bridge_core::OperationRegistry;
use tool_bridge_core::RegistryBuilder;
use tool_bridge_core::RoleLevel;
use tool_bridge_core::visible_names;

use crate::users::UserStore;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Builds the sealed registry for the sample host.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when registration conflicts or a configured
/// module matches no group.
pub fn build_registry(
    config: &ToolBridgeConfig,
    store: &Arc<UserStore>,
) -> Result<OperationRegistry, DiscoveryError> {
    let mut builder = RegistryBuilder::new(config.registry_options());
    for group in users::groups(store) {
        builder.add_group(group);
    }
    builder.build()
}

// ============================================================================
// SECTION: Catalog Listing
// ============================================================================

/// Catalog entry printed by `tool-bridge catalog`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Canonical tool name.
    pub name: String,
    /// Declaring group.
    pub group: String,
    /// Human-readable description.
    pub description: String,
    /// Listing classification.
    pub minimum_role: MinimumRole,
    /// Anonymous override.
    pub allow_anonymous: bool,
    /// Collected requirements, rendered for display.
    pub requirements: Vec<String>,
}

impl From<&OperationDescriptor> for CatalogEntry {
    fn from(descriptor: &OperationDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            group: descriptor.group.clone(),
            description: descriptor.description.clone(),
            minimum_role: descriptor.minimum_role,
            allow_anonymous: descriptor.allow_anonymous,
            requirements: descriptor.requirements.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Returns catalog entries in canonical-name order.
///
/// With a role, only entries a caller at that level would see are returned;
/// without one, the full catalog is returned.
#[must_use]
pub fn catalog_entries(registry: &OperationRegistry, role: Option<RoleLevel>) -> Vec<CatalogEntry> {
    let Some(role) = role else {
        return registry.iter().map(CatalogEntry::from).collect();
    };
    let visible = visible_names(Some(role), registry.iter());
    registry
        .iter()
        .filter(|descriptor| visible.contains(&descriptor.name))
        .map(CatalogEntry::from)
        .collect()
}
