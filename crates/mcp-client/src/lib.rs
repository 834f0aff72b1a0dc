//! `bp-mcp-client` — a client for MCP servers spoken to over child-process
//! stdio with line-delimited JSON-RPC 2.0.
//!
//! This crate provides:
//! - JSON-RPC envelope types and a line codec that tolerates banner/log text
//!   interleaved with protocol messages on stdout.
//! - A stdio [`Transport`](transport::Transport) over a spawned child's pipes.
//! - A [`Supervisor`](supervisor::Supervisor) that owns the child process
//!   lifecycle, including entitlement environment injection and termination.
//! - An [`McpSession`](session::McpSession) that sequences the
//!   `initialize` → `notifications/initialized` handshake and issues
//!   correlated `tools/list` / `tools/call` requests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bp_mcp_client::{McpSession, ServerConfig, Supervisor};
//!
//! let (supervisor, transport) = Supervisor::spawn(&ServerConfig::default())?;
//! let session = McpSession::new(transport);
//! session.settle(std::time::Duration::from_secs(1)).await?;
//! session.handshake().await?;
//! let response = session.call_tool("daisyUI-Snippets", serde_json::json!({})).await?;
//! session.close().await;
//! supervisor.shutdown().await;
//! ```

pub mod config;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod transport;

// Re-exports for convenience.
pub use config::{ServerConfig, SessionConfig};
pub use protocol::{Decoded, Envelope, RpcError, ToolsListResult};
pub use session::{McpSession, SessionError, SessionState};
pub use supervisor::Supervisor;
pub use transport::{StdioTransport, Transport, TransportError};
