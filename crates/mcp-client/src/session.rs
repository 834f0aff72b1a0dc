//! The RPC session: handshake sequencing, request/response correlation, and
//! tool invocation over a [`Transport`].
//!
//! The session issues requests serially — every send is followed by one
//! correlated read before the next send — so there is no pipelining and no
//! background reader. Every read runs under a deadline so a hung server
//! surfaces as [`SessionError::Timeout`] instead of blocking forever.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::protocol::{self, Decoded, Envelope, RpcError};
use crate::transport::{Transport, TransportError};

/// Lifecycle of a session against one server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Process spawned, handshake not yet attempted.
    Unstarted,
    /// `initialize` sent. A failed handshake stays here (degraded).
    Initializing,
    /// Handshake complete: initialize answered and `notifications/initialized` sent.
    Ready,
    /// The stream closed or the session was shut down. No further sends.
    Terminated,
}

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stream closed before a response arrived")]
    Closed,

    #[error("timed out after {0:?} waiting for response")]
    Timeout(Duration),

    #[error("initialize failed: {0}")]
    Handshake(RpcError),

    #[error("session is terminated")]
    Terminated,
}

/// A serial JSON-RPC session over one transport.
pub struct McpSession<T: Transport> {
    transport: T,
    state: Mutex<SessionState>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl<T: Transport> McpSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState::Unstarted),
            next_id: AtomicU64::new(1),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Override the per-exchange deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Get the next unique request ID.
    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn check_not_terminated(&self) -> Result<(), SessionError> {
        if self.state() == SessionState::Terminated {
            return Err(SessionError::Terminated);
        }
        Ok(())
    }

    /// Send a request with an explicit id. The caller consumes the response
    /// separately via [`read_response`](Self::read_response).
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        id: u64,
    ) -> Result<(), SessionError> {
        self.check_not_terminated()?;
        let line = protocol::encode(&Envelope::request(id, method, params))?;
        tracing::debug!(id, method, "sending MCP request");
        self.transport.write_line(&line).await?;
        Ok(())
    }

    /// Send a notification. No response will ever be read for it.
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), SessionError> {
        self.check_not_terminated()?;
        let line = protocol::encode(&Envelope::notification(method, params))?;
        tracing::debug!(method, "sending MCP notification");
        self.transport.write_line(&line).await?;
        Ok(())
    }

    /// Read the next decodable envelope, skipping banner/log lines and JSON
    /// that has no envelope shape. `Ok(None)` means the stream closed first
    /// and the session is now terminated.
    ///
    /// This primitive does not check request ids: a stale response is
    /// returned as-is. Exchanges go through
    /// [`read_response`](Self::read_response), which does correlate.
    pub async fn read_envelope(&self) -> Result<Option<Envelope>, SessionError> {
        loop {
            let Some(line) = self.transport.read_line().await? else {
                self.set_state(SessionState::Terminated);
                return Ok(None);
            };
            match protocol::decode(&line) {
                Decoded::Envelope(envelope) => return Ok(Some(envelope)),
                Decoded::NotJson => {
                    if !line.trim().is_empty() {
                        tracing::debug!(line = %line.trim(), "skipping non-JSON line from server stdout");
                    }
                }
                Decoded::NotEnvelope(value) => {
                    tracing::debug!(%value, "skipping JSON line without envelope shape");
                }
            }
        }
    }

    /// Read envelopes under the session deadline until one carries the given
    /// request id. Mismatched responses and server-initiated messages are
    /// discarded as out-of-band rather than delivered to the wrong caller.
    pub async fn read_response(&self, id: u64) -> Result<Envelope, SessionError> {
        let deadline = self.request_timeout;
        let result = tokio::time::timeout(deadline, async {
            loop {
                let Some(envelope) = self.read_envelope().await? else {
                    return Err(SessionError::Closed);
                };
                if envelope.id == Some(id) && envelope.is_response() {
                    return Ok(envelope);
                }
                tracing::debug!(
                    expected_id = id,
                    got_id = ?envelope.id,
                    method = ?envelope.method,
                    "discarding out-of-band message"
                );
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(SessionError::Timeout(deadline)),
        }
    }

    /// Let the server's startup output settle before the handshake: read and
    /// discard lines until either the window elapses with nothing further or
    /// a line decodes as valid JSON (structured output has begun).
    ///
    /// Replaces a fixed post-spawn sleep — a server that prints nothing
    /// costs exactly one window, and a chatty one is drained as fast as it
    /// prints.
    pub async fn settle(&self, window: Duration) -> Result<(), SessionError> {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            match tokio::time::timeout(remaining, self.transport.read_line()).await {
                // Quiet for the rest of the window: ready enough.
                Err(_) => return Ok(()),
                Ok(Ok(None)) => {
                    self.set_state(SessionState::Terminated);
                    return Err(SessionError::Closed);
                }
                Ok(Ok(Some(line))) => match protocol::decode(&line) {
                    Decoded::NotJson => {
                        if !line.trim().is_empty() {
                            tracing::debug!(line = %line.trim(), "discarding startup banner line");
                        }
                    }
                    _ => return Ok(()),
                },
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Perform the `initialize` → `notifications/initialized` handshake.
    ///
    /// On an error response the notification is not sent, the session stays
    /// degraded (never Ready), and the error payload is returned. The server
    /// process is left running.
    pub async fn handshake(&self) -> Result<(), SessionError> {
        let id = self.next_request_id();
        let params = serde_json::to_value(protocol::initialize_params())?;

        self.send_request("initialize", Some(params), id).await?;
        self.set_state(SessionState::Initializing);

        let response = self.read_response(id).await?;
        if let Some(error) = response.error {
            tracing::warn!(code = error.code, message = %error.message, "initialize rejected");
            return Err(SessionError::Handshake(error));
        }

        self.send_notification("notifications/initialized", None)
            .await?;
        self.set_state(SessionState::Ready);
        tracing::debug!("MCP handshake complete");
        Ok(())
    }

    /// Discover the server's tools (`tools/list`). Also drains any pending
    /// server-side output ahead of the real call. The response envelope is
    /// returned verbatim.
    pub async fn list_tools(&self) -> Result<Envelope, SessionError> {
        let id = self.next_request_id();
        self.send_request("tools/list", None, id).await?;
        self.read_response(id).await
    }

    /// Invoke one tool (`tools/call`) and return the response envelope
    /// verbatim — result or error, undecoded. Interpreting the payload is
    /// the tool's concern.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Envelope, SessionError> {
        let id = self.next_request_id();
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        self.send_request("tools/call", Some(params), id).await?;
        self.read_response(id).await
    }

    /// Close the transport and mark the session terminated.
    pub async fn close(&self) {
        self.transport.close().await;
        self.set_state(SessionState::Terminated);
    }
}
