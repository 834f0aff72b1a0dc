//! Process supervision for the spawned MCP server.
//!
//! The supervisor exclusively owns the child process handle; the session only
//! ever touches the stdin/stdout pipes through [`StdioTransport`]. Spawning a
//! package through `npx` resolves the executable remotely, so the launched
//! binary is treated as an opaque external collaborator.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::transport::{StdioTransport, TransportError};

/// How long a graceful shutdown waits before killing the child.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Owns the MCP server process.
pub struct Supervisor {
    child: Mutex<Child>,
    command: String,
}

impl Supervisor {
    /// Spawn the server with piped stdin/stdout and inherited stderr, and
    /// apply the config's environment overrides on top of the inherited
    /// environment.
    pub fn spawn(config: &ServerConfig) -> Result<(Self, StdioTransport), TransportError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // Diagnostics pass through to the host unmodified.
            .stderr(Stdio::inherit());

        for (key, value) in config.environment() {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| TransportError::Spawn {
            command: config.command.clone(),
            source,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdin",
            ))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdout",
            ))
        })?;

        tracing::info!(command = %config.command, args = ?config.args, "spawned MCP server");

        Ok((
            Self {
                child: Mutex::new(child),
                command: config.command.clone(),
            },
            StdioTransport::new(stdin, stdout),
        ))
    }

    /// Request termination without waiting for exit. Output buffers are not
    /// flushed: any reads the caller needs must already have happened. Also
    /// the only way to get unstuck from a server that never became
    /// responsive.
    pub async fn terminate(&self) {
        let mut child = self.child.lock().await;
        if let Err(e) = child.start_kill() {
            tracing::debug!(command = %self.command, error = %e, "terminate: child already gone");
        }
    }

    /// Wait for the child to exit, killing it after a grace period. The
    /// caller should close the transport first so the child sees EOF on its
    /// stdin.
    pub async fn shutdown(&self) {
        let mut child = self.child.lock().await;
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(command = %self.command, ?status, "MCP server exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(command = %self.command, error = %e, "error waiting for MCP server");
            }
            Err(_) => {
                tracing::warn!(command = %self.command, "MCP server did not exit in time, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(command = %self.command, error = %e, "failed to kill MCP server");
                }
            }
        }
    }

    /// Whether the child is still running.
    pub async fn is_running(&self) -> bool {
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_nonexistent_command_fails() {
        let config = ServerConfig {
            command: "nonexistent-mcp-server-12345".into(),
            args: vec![],
            ..Default::default()
        };
        match Supervisor::spawn(&config) {
            Err(TransportError::Spawn { command, .. }) => {
                assert_eq!(command, "nonexistent-mcp-server-12345");
            }
            other => panic!("expected spawn failure, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn terminate_kills_running_child() {
        let config = ServerConfig {
            command: "sleep".into(),
            args: vec!["60".into()],
            ..Default::default()
        };
        let (supervisor, _transport) = Supervisor::spawn(&config).unwrap();
        assert!(supervisor.is_running().await);

        supervisor.terminate().await;
        supervisor.shutdown().await;
        assert!(!supervisor.is_running().await);
    }
}
