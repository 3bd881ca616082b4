// crates/tool-bridge-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for tool-bridge-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use tool_bridge_config::ConfigError;
use tool_bridge_config::PrincipalConfig;
use tool_bridge_config::ServerAuthMode;
use tool_bridge_config::ServerTransport;
use tool_bridge_config::ToolBridgeConfig;

/// Parses a TOML string into a `ToolBridgeConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<ToolBridgeConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<ToolBridgeConfig, toml::de::Error> {
    config_from_toml("")
}

/// Returns an HTTP config bound to `bind` with bearer-token principals.
pub fn bearer_config(bind: &str) -> Result<ToolBridgeConfig, toml::de::Error> {
    let mut config = minimal_config()?;
    config.server.transport = ServerTransport::Http;
    config.server.bind = Some(bind.to_string());
    config.server.auth.mode = ServerAuthMode::BearerToken;
    config.server.auth.principals = vec![principal("alice", "token-alice", &["Member"])];
    Ok(config)
}

/// Builds a principal mapping.
pub fn principal(subject: &str, token: &str, roles: &[&str]) -> PrincipalConfig {
    PrincipalConfig {
        subject: subject.to_string(),
        token: token.to_string(),
        roles: roles.iter().map(ToString::to_string).collect(),
    }
}

/// Assert that a validation result is an error containing a specific substring.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
