//! JSON-RPC 2.0 envelope types and the line codec for the MCP stdio protocol.
//!
//! Each message is a single line of JSON (newline-delimited). Servers launched
//! via `npx` tend to print banner and log text on stdout before (and between)
//! protocol messages, so the decoder classifies lines instead of failing:
//! callers skip non-protocol lines and keep reading.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The constant `jsonrpc` version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision sent during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A JSON-RPC 2.0 message.
///
/// One struct covers all three shapes on the wire:
/// - request: `method` + `id` (expects a response carrying the same `id`)
/// - notification: `method`, no `id` (fire-and-forget)
/// - response: `id` + exactly one of `result` / `error`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Envelope {
    /// Build a request. `params` defaults to an empty object when `None`,
    /// so every outgoing request carries a `params` field.
    pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: Some(id),
            method: Some(method.into()),
            params: Some(params.unwrap_or_else(|| serde_json::json!({}))),
            result: None,
            error: None,
        }
    }

    /// Build a notification (no `id`, no response expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: None,
            method: Some(method.into()),
            params: Some(params.unwrap_or_else(|| serde_json::json!({}))),
            result: None,
            error: None,
        }
    }

    /// True if this message is a response (carries a `result` or an `error`).
    pub fn is_response(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }

    /// Check if the envelope carries an error payload.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extract the result value, returning the error payload if present.
    pub fn into_result(self) -> Result<Value, RpcError> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Line codec
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of decoding a single line from the server's stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The line is a JSON-RPC envelope.
    Envelope(Envelope),
    /// The line is not valid JSON (banner text, log output). Keep reading.
    NotJson,
    /// The line is valid JSON but does not have envelope shape
    /// (no `method` and no `id`/`result`/`error`). Keep reading.
    NotEnvelope(Value),
}

/// Serialize an envelope to one line of JSON with exactly one trailing
/// newline. `serde_json` never emits raw newlines inside a compact document,
/// so the terminator is the sole delimiter.
pub fn encode(envelope: &Envelope) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(envelope)?;
    line.push('\n');
    Ok(line)
}

/// Decode one line. Never fails: lines that are not valid JSON come back as
/// [`Decoded::NotJson`] and valid JSON that is not a JSON-RPC envelope comes
/// back as [`Decoded::NotEnvelope`].
pub fn decode(line: &str) -> Decoded {
    let value: Value = match serde_json::from_str(line.trim()) {
        Ok(v) => v,
        Err(_) => return Decoded::NotJson,
    };

    // An envelope must be an object carrying at least a method or one of the
    // response fields. Anything else (a bare number, an unrelated object) is
    // out-of-band output.
    let shaped = value.as_object().is_some_and(|obj| {
        obj.contains_key("method")
            || obj.contains_key("id")
            || obj.contains_key("result")
            || obj.contains_key("error")
    });
    if !shaped {
        return Decoded::NotEnvelope(value);
    }

    match serde_json::from_value::<Envelope>(value.clone()) {
        Ok(envelope) => Decoded::Envelope(envelope),
        // Shaped like an envelope but with fields we cannot represent
        // (e.g. a string id). Treated as out-of-band.
        Err(_) => Decoded::NotEnvelope(value),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MCP payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Client info sent during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Parameters for the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

/// Build the `initialize` request parameters.
///
/// The capability namespaces are declared but empty: support acknowledged,
/// no specific sub-capabilities offered.
pub fn initialize_params() -> InitializeParams {
    InitializeParams {
        protocol_version: PROTOCOL_VERSION.into(),
        capabilities: serde_json::json!({
            "resources": {},
            "tools": {},
            "prompts": {}
        }),
        client_info: ClientInfo {
            name: "blueprint-client".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        },
    }
}

/// A single tool definition returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: Value,
}

fn default_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// The result payload from `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDef>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_request() {
        let req = Envelope::request(
            1,
            "initialize",
            Some(serde_json::json!({ "protocolVersion": "2024-11-05" })),
        );
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"method\":\"initialize\""));
    }

    #[test]
    fn request_params_default_to_empty_object() {
        let req = Envelope::request(4, "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"params\":{}"));
    }

    #[test]
    fn serialize_notification_has_no_id() {
        let notif = Envelope::notification("notifications/initialized", None);
        let json = serde_json::to_string(&notif).unwrap();
        assert!(json.contains("\"method\":\"notifications/initialized\""));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn encode_terminates_with_single_newline() {
        let line = encode(&Envelope::request(1, "initialize", None)).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn roundtrip_request() {
        let req = Envelope::request(
            5,
            "tools/call",
            Some(serde_json::json!({"name": "daisyUI-Snippets", "arguments": {}})),
        );
        let line = encode(&req).unwrap();
        match decode(&line) {
            Decoded::Envelope(parsed) => assert_eq!(parsed, req),
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn roundtrip_notification() {
        let notif = Envelope::notification("notifications/initialized", None);
        let line = encode(&notif).unwrap();
        match decode(&line) {
            Decoded::Envelope(parsed) => assert_eq!(parsed, notif),
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn decode_banner_text_is_not_json() {
        assert_eq!(decode("Loading..."), Decoded::NotJson);
        assert_eq!(decode("npm warn deprecated foo@1.0.0"), Decoded::NotJson);
        assert_eq!(decode(""), Decoded::NotJson);
    }

    #[test]
    fn decode_recovers_after_garbage() {
        assert_eq!(decode("Loading..."), Decoded::NotJson);
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        match decode(raw) {
            Decoded::Envelope(env) => assert_eq!(env.id, Some(1)),
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn decode_json_without_envelope_shape() {
        match decode(r#"{"status":"starting"}"#) {
            Decoded::NotEnvelope(v) => assert_eq!(v["status"], "starting"),
            other => panic!("expected NotEnvelope, got {other:?}"),
        }
        assert!(matches!(decode("42"), Decoded::NotEnvelope(_)));
    }

    #[test]
    fn decode_success_response() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#;
        match decode(raw) {
            Decoded::Envelope(env) => {
                assert!(env.is_response());
                assert!(!env.is_error());
                let val = env.into_result().unwrap();
                assert!(val.get("capabilities").is_some());
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn decode_error_response() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32600,"message":"Invalid request"}}"#;
        match decode(raw) {
            Decoded::Envelope(env) => {
                assert!(env.is_error());
                let err = env.into_result().unwrap_err();
                assert_eq!(err.code, -32600);
                assert_eq!(err.message, "Invalid request");
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn initialize_params_declares_empty_namespaces() {
        let params = initialize_params();
        assert_eq!(params.protocol_version, "2024-11-05");
        for ns in ["resources", "tools", "prompts"] {
            assert_eq!(params.capabilities[ns], serde_json::json!({}));
        }
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("protocolVersion").is_some());
        assert!(json.get("clientInfo").is_some());
    }

    #[test]
    fn deserialize_tools_list_result() {
        let raw = r#"{
            "tools": [
                {
                    "name": "daisyUI-Snippets",
                    "description": "Fetch component snippets",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "component-examples": { "type": "object" }
                        }
                    }
                }
            ]
        }"#;
        let result: ToolsListResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.tools[0].name, "daisyUI-Snippets");
    }

    #[test]
    fn tools_list_missing_description_defaults_empty() {
        let raw = r#"{ "tools": [{ "name": "ping" }] }"#;
        let result: ToolsListResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.tools[0].description, "");
    }

    #[test]
    fn rpc_error_display() {
        let err = RpcError {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        };
        assert_eq!(format!("{err}"), "JSON-RPC error -32601: Method not found");
    }
}
