//! Configuration for spawning and talking to a blueprint MCP server.
//!
//! These are plain serde structs so the orchestration binary can include them
//! in its own TOML config. No process-wide state: the supervisor receives an
//! explicit [`ServerConfig`] at spawn time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variable carrying the license token the server checks.
pub const LICENSE_VAR: &str = "LICENSE";

/// Environment variable carrying the contact email the server checks.
pub const EMAIL_VAR: &str = "EMAIL";

/// How to launch the MCP server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The command to spawn (e.g. `"npx"`).
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments to pass to the command.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Extra environment variables to set on the spawned process,
    /// on top of the inherited environment.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// License token required by the server for entitlement. Opaque,
    /// passed through unvalidated. Falls back to the inherited `LICENSE`
    /// environment variable when unset.
    #[serde(default)]
    pub license: Option<String>,

    /// Contact email paired with the license. Same pass-through rules.
    #[serde(default)]
    pub email: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            env: HashMap::new(),
            license: None,
            email: None,
        }
    }
}

impl ServerConfig {
    /// The environment overrides to apply on top of the inherited
    /// environment: the configured extras plus the two entitlement
    /// variables when present.
    pub fn environment(&self) -> HashMap<String, String> {
        let mut env = self.env.clone();
        if let Some(license) = &self.license {
            env.insert(LICENSE_VAR.into(), license.clone());
        }
        if let Some(email) = &self.email {
            env.insert(EMAIL_VAR.into(), email.clone());
        }
        env
    }
}

fn default_command() -> String {
    "npx".into()
}

fn default_args() -> Vec<String> {
    vec!["-y".into(), "daisyui-blueprint@latest".into()]
}

/// Session-level tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Deadline for each request/response exchange, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long to let the server's startup banner settle before the
    /// handshake, in milliseconds.
    #[serde(default = "default_startup_window_ms")]
    pub startup_window_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            startup_window_ms: default_startup_window_ms(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_startup_window_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_defaults() {
        let cfg: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.command, "npx");
        assert_eq!(cfg.args, vec!["-y", "daisyui-blueprint@latest"]);
        assert!(cfg.env.is_empty());
        assert!(cfg.license.is_none());
    }

    #[test]
    fn deserialize_with_env() {
        let raw = r#"
            command = "node"
            args = ["server.js"]

            [env]
            NODE_ENV = "production"
        "#;
        let cfg: ServerConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.command, "node");
        assert_eq!(cfg.env.get("NODE_ENV").unwrap(), "production");
    }

    #[test]
    fn environment_injects_credentials() {
        let cfg = ServerConfig {
            license: Some("SUV85-M5006-UP3DF-O4R8W-WP6JW".into()),
            email: Some("user@example.com".into()),
            ..Default::default()
        };
        let env = cfg.environment();
        assert_eq!(env.get(LICENSE_VAR).unwrap(), "SUV85-M5006-UP3DF-O4R8W-WP6JW");
        assert_eq!(env.get(EMAIL_VAR).unwrap(), "user@example.com");
    }

    #[test]
    fn environment_omits_unset_credentials() {
        let env = ServerConfig::default().environment();
        assert!(!env.contains_key(LICENSE_VAR));
        assert!(!env.contains_key(EMAIL_VAR));
    }

    #[test]
    fn session_config_defaults() {
        let cfg: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.startup_window_ms, 1000);
    }
}
