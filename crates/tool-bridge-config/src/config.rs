// crates/tool-bridge-config/src/config.rs
// ============================================================================
// Module: Tool Bridge Configuration
// Description: Configuration loading and validation for the Tool Bridge server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: tool-bridge-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Every section has safe
//! defaults, so an empty file yields a local-only stdio server that exposes
//! every registered module with the standard role policies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tool_bridge_core::NamingConvention;
use tool_bridge_core::PolicyRoleMap;
use tool_bridge_core::RegistryOptions;
use tool_bridge_core::RoleLevel;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "tool-bridge.toml";
/// Environment variable naming the config path.
pub const CONFIG_ENV_VAR: &str = "TOOL_BRIDGE_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a full path.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured principals.
pub(crate) const MAX_PRINCIPALS: usize = 64;
/// Maximum bearer token length.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Maximum principal subject length.
pub(crate) const MAX_AUTH_SUBJECT_LENGTH: usize = 512;
/// Maximum roles per principal.
pub(crate) const MAX_PRINCIPAL_ROLES: usize = 128;
/// Maximum configured policies.
pub(crate) const MAX_POLICIES: usize = 128;
/// Maximum configured modules.
pub(crate) const MAX_MODULES: usize = 128;
/// Maximum endpoint path length.
pub(crate) const MAX_ENDPOINT_PATH_LENGTH: usize = 256;
/// Maximum request body size.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for the Tool Bridge server.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolBridgeConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Tool exposure configuration.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Policy definitions.
    #[serde(default = "default_policies")]
    pub policies: Vec<PolicyConfig>,
}

impl Default for ToolBridgeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tools: ToolsConfig::default(),
            policies: default_policies(),
        }
    }
}

impl ToolBridgeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.tools.validate()?;
        if self.policies.len() > MAX_POLICIES {
            return Err(ConfigError::Invalid("too many policies".to_string()));
        }
        let mut seen = BTreeSet::new();
        for policy in &self.policies {
            policy.validate()?;
            if !seen.insert(policy.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate policy: {}", policy.name)));
            }
        }
        Ok(())
    }

    /// Returns the policy-to-role map built from `minimum_role` policies.
    #[must_use]
    pub fn policy_role_map(&self) -> PolicyRoleMap {
        self.policies
            .iter()
            .filter_map(|policy| policy.minimum_role.map(|level| (policy.name.clone(), level)))
            .collect()
    }

    /// Returns registry options derived from the tools and policy sections.
    #[must_use]
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            naming: self.tools.naming,
            modules: self.tools.modules.iter().cloned().collect(),
            policy_map: self.policy_role_map(),
        }
    }
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// Server transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Content-Length framed JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport type.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// HTTP endpoint path.
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Maximum concurrent in-flight requests.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    /// Caller authentication configuration.
    #[serde(default)]
    pub auth: ServerAuthConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            endpoint_path: default_endpoint_path(),
            max_body_bytes: default_max_body_bytes(),
            max_inflight: default_max_inflight(),
            auth: ServerAuthConfig::default(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid("max_body_bytes too large".to_string()));
        }
        if self.max_inflight == 0 {
            return Err(ConfigError::Invalid("max_inflight must be greater than zero".to_string()));
        }
        validate_endpoint_path(&self.endpoint_path)?;
        self.auth.validate()?;
        self.audit.validate()?;
        match self.transport {
            ServerTransport::Http => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http transport requires bind address".to_string(),
                    ));
                }
                let addr: SocketAddr = bind
                    .parse()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
                if !addr.ip().is_loopback() && self.auth.mode == ServerAuthMode::LocalOnly {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind disallowed without auth policy".to_string(),
                    ));
                }
            }
            ServerTransport::Stdio => {
                if self.auth.mode != ServerAuthMode::LocalOnly {
                    return Err(ConfigError::Invalid(
                        "stdio transport only supports local_only auth".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parses the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address is missing or malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.as_deref().unwrap_or_default().trim();
        bind.parse().map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }
}

/// Caller authentication modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerAuthMode {
    /// Only stdio and loopback callers; they act as the local principal.
    #[default]
    LocalOnly,
    /// Static bearer tokens mapped to principals.
    BearerToken,
}

impl ServerAuthMode {
    /// Returns the stable mode label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalOnly => "local_only",
            Self::BearerToken => "bearer_token",
        }
    }
}

/// Caller authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuthConfig {
    /// Authentication mode.
    #[serde(default)]
    pub mode: ServerAuthMode,
    /// Reject unauthenticated callers on every method except handshake.
    #[serde(default = "default_true")]
    pub require_authentication: bool,
    /// Run the authorization pre-filter before invocations.
    #[serde(default = "default_true")]
    pub enforce_authorization: bool,
    /// Subject assigned to local callers.
    #[serde(default = "default_local_subject")]
    pub local_subject: String,
    /// Role claims assigned to local callers.
    #[serde(default = "default_local_roles")]
    pub local_roles: Vec<String>,
    /// Token-to-principal mappings for `bearer_token` mode.
    #[serde(default)]
    pub principals: Vec<PrincipalConfig>,
}

impl Default for ServerAuthConfig {
    fn default() -> Self {
        Self {
            mode: ServerAuthMode::LocalOnly,
            require_authentication: true,
            enforce_authorization: true,
            local_subject: default_local_subject(),
            local_roles: default_local_roles(),
            principals: Vec::new(),
        }
    }
}

impl ServerAuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_subject("server.auth.local_subject", &self.local_subject)?;
        validate_roles("server.auth.local_roles", &self.local_roles)?;
        if self.principals.len() > MAX_PRINCIPALS {
            return Err(ConfigError::Invalid("too many principal mappings".to_string()));
        }
        let mut tokens = BTreeSet::new();
        for principal in &self.principals {
            principal.validate()?;
            if !tokens.insert(principal.token.as_str()) {
                return Err(ConfigError::Invalid("duplicate principal token".to_string()));
            }
        }
        if self.mode == ServerAuthMode::BearerToken && self.principals.is_empty() {
            return Err(ConfigError::Invalid(
                "bearer_token auth requires principals".to_string(),
            ));
        }
        Ok(())
    }
}

/// Principal mapping for bearer tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalConfig {
    /// Principal subject.
    pub subject: String,
    /// Bearer token presented by the principal.
    pub token: String,
    /// Role claims granted to the principal.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl PrincipalConfig {
    /// Validates a principal mapping.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_subject("principal subject", &self.subject)?;
        if self.token.trim().is_empty() {
            return Err(ConfigError::Invalid("auth token must be non-empty".to_string()));
        }
        if self.token.len() > MAX_AUTH_TOKEN_LENGTH {
            return Err(ConfigError::Invalid("auth token too long".to_string()));
        }
        if self.token.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid("auth token must not contain whitespace".to_string()));
        }
        validate_roles("principal roles", &self.roles)
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tools Config
// ============================================================================

/// Tool exposure configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsConfig {
    /// Module (group) names to expose; empty exposes every module.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Naming convention for tool names and payload fields.
    #[serde(default)]
    pub naming: NamingConvention,
    /// Apply the naming convention to payload object keys.
    #[serde(default)]
    pub rename_fields: bool,
}

impl ToolsConfig {
    /// Validates tool exposure configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.modules.len() > MAX_MODULES {
            return Err(ConfigError::Invalid("too many tools.modules entries".to_string()));
        }
        let mut seen = BTreeSet::new();
        for module in &self.modules {
            if module.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "tools.modules entries must be non-empty".to_string(),
                ));
            }
            if !seen.insert(module.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate module: {module}")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Policy Config
// ============================================================================

/// Named policy evaluated by the claims oracle.
///
/// # Invariants
/// - Exactly one of `minimum_role` and `any_role` is set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Policy name referenced by requirements.
    pub name: String,
    /// Minimum role level; also classifies listing visibility.
    #[serde(default)]
    pub minimum_role: Option<RoleLevel>,
    /// Role names, any of which satisfies the policy.
    #[serde(default)]
    pub any_role: Vec<String>,
}

impl PolicyConfig {
    /// Builds a minimum-role policy.
    #[must_use]
    pub fn minimum(name: impl Into<String>, level: RoleLevel) -> Self {
        Self {
            name: name.into(),
            minimum_role: Some(level),
            any_role: Vec::new(),
        }
    }

    /// Validates a policy definition.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("policy name must be non-empty".to_string()));
        }
        match (self.minimum_role, self.any_role.is_empty()) {
            (Some(_), false) => Err(ConfigError::Invalid(format!(
                "policy {} must set only one of minimum_role and any_role",
                self.name
            ))),
            (None, true) => Err(ConfigError::Invalid(format!(
                "policy {} requires minimum_role or any_role",
                self.name
            ))),
            (None, false) => validate_roles("policy any_role", &self.any_role),
            (Some(_), true) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the HTTP endpoint path.
fn validate_endpoint_path(value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Invalid("server.endpoint_path must start with /".to_string()));
    }
    if value.len() > MAX_ENDPOINT_PATH_LENGTH {
        return Err(ConfigError::Invalid("server.endpoint_path too long".to_string()));
    }
    if value.chars().any(|ch| ch.is_whitespace() || matches!(ch, '?' | '#' | '{' | '}')) {
        return Err(ConfigError::Invalid(
            "server.endpoint_path contains invalid characters".to_string(),
        ));
    }
    // The route is literal; capture syntax is rejected or re-interpreted by the router.
    if value.split('/').skip(1).any(|segment| segment.starts_with([':', '*'])) {
        return Err(ConfigError::Invalid(
            "server.endpoint_path must not contain route parameters".to_string(),
        ));
    }
    Ok(())
}

/// Validates a subject string.
fn validate_subject(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_AUTH_SUBJECT_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} too long")));
    }
    Ok(())
}

/// Validates a list of role names.
fn validate_roles(field: &str, roles: &[String]) -> Result<(), ConfigError> {
    if roles.len() > MAX_PRINCIPAL_ROLES {
        return Err(ConfigError::Invalid(format!("too many {field}")));
    }
    if roles.iter().any(|role| role.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
    }
    Ok(())
}

/// Default endpoint path.
fn default_endpoint_path() -> String {
    "/mcp".to_string()
}

/// Default maximum request body size.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default maximum in-flight requests.
pub(crate) const fn default_max_inflight() -> usize {
    256
}

/// Serde default for boolean toggles that start enabled.
const fn default_true() -> bool {
    true
}

/// Default subject for local callers.
fn default_local_subject() -> String {
    "local".to_string()
}

/// Default roles for local callers.
fn default_local_roles() -> Vec<String> {
    vec![RoleLevel::Admin.as_str().to_string()]
}

/// Default policy set: one minimum-role policy per elevated level.
fn default_policies() -> Vec<PolicyConfig> {
    vec![
        PolicyConfig::minimum("RequireMember", RoleLevel::Member),
        PolicyConfig::minimum("RequireManager", RoleLevel::Manager),
        PolicyConfig::minimum("RequireAdmin", RoleLevel::Admin),
    ]
}
