use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use bp_mcp_client::{ServerConfig, SessionConfig};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ── Tool invocation ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Name of the tool to invoke.
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Component example keys to request from the blueprint server.
    #[serde(default = "default_components")]
    pub components: Vec<String>,
}

impl RequestConfig {
    /// Build the `tools/call` arguments: every requested component key
    /// mapped to `true` under `component-examples`.
    pub fn arguments(&self) -> serde_json::Value {
        let examples: serde_json::Map<String, serde_json::Value> = self
            .components
            .iter()
            .map(|c| (c.clone(), serde_json::Value::Bool(true)))
            .collect();
        serde_json::json!({ "component-examples": examples })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            components: default_components(),
        }
    }
}

fn default_tool() -> String {
    "daisyUI-Snippets".into()
}

fn default_components() -> Vec<String> {
    vec![
        "modal.modal-using-dialog".into(),
        "modal.modal-with-close-button".into(),
    ]
}

// ── Output artifact ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where to write the final response envelope (pretty-printed JSON,
    /// overwriting any prior content).
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("blueprint_components.json")
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for missing keys.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
