// crates/tool-bridge-core/src/runtime/registry.rs
// ============================================================================
// Module: Operation Registry
// Description: Builds the immutable catalog of exposed operations.
// Purpose: Validate registration specs once at startup and serve lookups after.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! [`RegistryBuilder`] collects host [`GroupSpec`]s and turns them into an
//! [`OperationRegistry`]. Unexposed groups and operations are skipped;
//! groups outside the configured module set are skipped. Requirements are
//! collected operation-first, then group; anonymous markers are combined.
//!
//! ## Invariants
//! - Canonical names are unique; a duplicate aborts the build.
//! - The registry is never mutated after [`RegistryBuilder::build`].
//! - Malformed requirement metadata aborts the build.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::GroupSpec;
use crate::core::NamingConvention;
use crate::core::OperationDescriptor;
use crate::core::PolicyRoleMap;
use crate::core::canonicalize;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal discovery failures. Any of these aborts startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Two operations canonicalize to the same tool name.
    #[error("duplicate tool name {name}: {first} and {second}")]
    DuplicateName {
        /// Canonical name.
        name: String,
        /// First declaring operation (`group.identifier`).
        first: String,
        /// Second declaring operation (`group.identifier`).
        second: String,
    },
    /// A requirement on an operation or group is malformed.
    #[error("malformed requirement on {operation}: {detail}")]
    MalformedRequirement {
        /// Operation (`group.identifier`) or group name.
        operation: String,
        /// Problem description.
        detail: String,
    },
    /// An operation identifier canonicalizes to an empty name.
    #[error("operation in group {group} has an empty identifier")]
    EmptyIdentifier {
        /// Declaring group.
        group: String,
    },
    /// A group has an empty name.
    #[error("group name is empty")]
    EmptyGroupName,
    /// A configured module matches no registered group.
    #[error("configured module not registered: {0}")]
    UnknownModule(String),
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Registry construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Naming convention for tool names.
    pub naming: NamingConvention,
    /// Module (group) names to expose; empty exposes every group.
    pub modules: BTreeSet<String>,
    /// Policy-to-role map for listing classification.
    pub policy_map: PolicyRoleMap,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            naming: NamingConvention::SnakeCase,
            modules: BTreeSet::new(),
            policy_map: PolicyRoleMap::standard(),
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Collects registration specs before the registry is sealed.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Construction options.
    options: RegistryOptions,
    /// Registered groups in declaration order.
    groups: Vec<GroupSpec>,
}

impl RegistryBuilder {
    /// Creates a builder with the given options.
    #[must_use]
    pub const fn new(options: RegistryOptions) -> Self {
        Self {
            options,
            groups: Vec::new(),
        }
    }

    /// Adds a group.
    #[must_use]
    pub fn group(mut self, group: GroupSpec) -> Self {
        self.groups.push(group);
        self
    }

    /// Adds a group in place.
    pub fn add_group(&mut self, group: GroupSpec) {
        self.groups.push(group);
    }

    /// Validates every spec and seals the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] on duplicate names, malformed metadata,
    /// empty identifiers, or configured modules that match no group.
    pub fn build(self) -> Result<OperationRegistry, DiscoveryError> {
        let Self { options, groups } = self;
        let known: BTreeSet<&str> = groups.iter().map(|group| group.name.as_str()).collect();
        if let Some(missing) = options.modules.iter().find(|name| !known.contains(name.as_str())) {
            return Err(DiscoveryError::UnknownModule(missing.clone()));
        }

        let mut descriptors: BTreeMap<String, Arc<OperationDescriptor>> = BTreeMap::new();
        for group in groups {
            if group.name.trim().is_empty() {
                return Err(DiscoveryError::EmptyGroupName);
            }
            if !group.exposed {
                continue;
            }
            if !options.modules.is_empty() && !options.modules.contains(&group.name) {
                continue;
            }
            for requirement in &group.requirements {
                requirement.validate().map_err(|err| DiscoveryError::MalformedRequirement {
                    operation: group.name.clone(),
                    detail: err.to_string(),
                })?;
            }
            for operation in &group.operations {
                if !operation.exposed {
                    continue;
                }
                let qualified = format!("{}.{}", group.name, operation.identifier);
                let name = canonicalize(&operation.identifier, options.naming);
                if name.is_empty() {
                    return Err(DiscoveryError::EmptyIdentifier {
                        group: group.name.clone(),
                    });
                }
                for requirement in &operation.requirements {
                    requirement.validate().map_err(|err| {
                        DiscoveryError::MalformedRequirement {
                            operation: qualified.clone(),
                            detail: err.to_string(),
                        }
                    })?;
                }
                if let Some(existing) = descriptors.get(&name) {
                    return Err(DiscoveryError::DuplicateName {
                        name,
                        first: format!("{}.{}", existing.group, existing.identifier),
                        second: qualified,
                    });
                }
                let requirements: Vec<_> = operation
                    .requirements
                    .iter()
                    .chain(group.requirements.iter())
                    .cloned()
                    .collect();
                let minimum_role = options.policy_map.minimum_role(&requirements);
                let descriptor = OperationDescriptor {
                    name: name.clone(),
                    identifier: operation.identifier.clone(),
                    group: group.name.clone(),
                    description: operation.description.clone(),
                    input_schema: operation.input_schema.clone(),
                    is_static: operation.invoker.is_static(),
                    requirements,
                    allow_anonymous: operation.allow_anonymous || group.allow_anonymous,
                    minimum_role,
                    invoker: operation.invoker.clone(),
                };
                descriptors.insert(name, Arc::new(descriptor));
            }
        }
        Ok(OperationRegistry {
            inner: Arc::new(RegistryInner {
                naming: options.naming,
                policy_map: options.policy_map,
                descriptors,
            }),
        })
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Shared registry state.
#[derive(Debug)]
struct RegistryInner {
    /// Naming convention used for tool names.
    naming: NamingConvention,
    /// Policy map used for classification.
    policy_map: PolicyRoleMap,
    /// Descriptors keyed by canonical name.
    descriptors: BTreeMap<String, Arc<OperationDescriptor>>,
}

/// Immutable, cheaply clonable catalog of operations.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    /// Shared state.
    inner: Arc<RegistryInner>,
}

impl OperationRegistry {
    /// Looks up a descriptor by canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.inner.descriptors.get(name).map(Arc::as_ref)
    }

    /// Iterates descriptors in canonical-name order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.inner.descriptors.values().map(Arc::as_ref)
    }

    /// Returns the canonical names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.inner.descriptors.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.descriptors.len()
    }

    /// Returns true when no operations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.descriptors.is_empty()
    }

    /// Returns the naming convention used for tool names.
    #[must_use]
    pub fn naming(&self) -> NamingConvention {
        self.inner.naming
    }

    /// Returns the policy map used for classification.
    #[must_use]
    pub fn policy_map(&self) -> &PolicyRoleMap {
        &self.inner.policy_map
    }
}
