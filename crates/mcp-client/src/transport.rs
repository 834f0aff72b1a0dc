//! Byte-level transport to the MCP server's standard streams.
//!
//! Each JSON-RPC message is a single newline-delimited line. The transport
//! only moves lines; deciding whether a line is protocol or noise belongs to
//! the session layer.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex;

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("transport is closed")]
    Closed,
}

/// Line-oriented transport to an MCP server.
///
/// `read_line` returns `Ok(None)` when the peer closes its output stream;
/// closure is a normal outcome, not an error, and callers must check for it
/// explicitly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one line and flush, so the peer observes the message promptly.
    /// The line must not contain embedded newlines; the terminator is
    /// appended here if missing.
    async fn write_line(&self, line: &str) -> Result<(), TransportError>;

    /// Block until a full line is available or the stream closes.
    /// `Ok(None)` signals end of stream.
    async fn read_line(&self) -> Result<Option<String>, TransportError>;

    /// Whether the peer's output stream is still open.
    fn is_alive(&self) -> bool;

    /// Close the write side (the child sees EOF on its stdin).
    async fn close(&self);
}

/// Stdio transport: talks to a child process over its stdin/stdout pipes.
///
/// The pipes are bound 1:1 to one child process. The child's stderr is not
/// held here at all — the supervisor spawns with `Stdio::inherit()` so
/// diagnostics pass straight through to the host environment.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    alive: AtomicBool,
}

impl StdioTransport {
    /// Wrap the pipes of an already-spawned child.
    pub fn new(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            alive: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn write_line(&self, line: &str) -> Result<(), TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            stdin.write_all(b"\n").await?;
        }
        stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&self) -> Result<Option<String>, TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut stdout = self.stdout.lock().await;
        let mut line = String::new();
        let bytes_read = stdout.read_line(&mut line).await?;
        if bytes_read == 0 {
            self.alive.store(false, Ordering::SeqCst);
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let mut stdin = self.stdin.lock().await;
        if let Err(e) = stdin.shutdown().await {
            tracing::debug!(error = %e, "error closing MCP server stdin");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::supervisor::Supervisor;

    // `cat` echoes stdin to stdout, which is enough to exercise the
    // line framing against a real child process.
    #[tokio::test]
    #[cfg(unix)]
    async fn echo_roundtrip_through_cat() {
        let config = ServerConfig {
            command: "cat".into(),
            args: vec![],
            ..Default::default()
        };
        let (supervisor, transport) = Supervisor::spawn(&config).unwrap();

        transport
            .write_line(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .await
            .unwrap();
        let line = transport.read_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);

        transport.close().await;
        supervisor.shutdown().await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn read_after_child_exit_is_end_of_stream() {
        let config = ServerConfig {
            command: "true".into(),
            args: vec![],
            ..Default::default()
        };
        let (supervisor, transport) = Supervisor::spawn(&config).unwrap();

        assert_eq!(transport.read_line().await.unwrap(), None);
        assert!(!transport.is_alive());

        // Writing after closure is an error, not a hang.
        transport.close().await;
        assert!(matches!(
            transport.write_line("{}").await,
            Err(TransportError::Closed)
        ));

        supervisor.shutdown().await;
    }
}
