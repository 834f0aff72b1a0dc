//! The scripted run: spawn the blueprint server, handshake, discover tools,
//! fetch the requested component snippets, and persist the raw response.

use std::path::Path;
use std::time::Duration;

use bp_mcp_client::{
    Envelope, McpSession, SessionError, StdioTransport, Supervisor, ToolsListResult,
};

use crate::config::Config;

/// Run one full client session against the configured server.
///
/// A failed handshake degrades the session but does not abort the run: the
/// tool call is still attempted and whatever response comes back — including
/// an error-shaped one — is persisted.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let (supervisor, transport) = Supervisor::spawn(&config.server)?;
    let session = McpSession::new(transport)
        .with_request_timeout(Duration::from_secs(config.session.request_timeout_secs));

    let outcome = drive(config, &session).await;

    session.close().await;
    supervisor.shutdown().await;

    let response = outcome?;
    persist_response(&config.output.path, &response)?;
    tracing::info!(path = %config.output.path.display(), "saved components");
    println!("Saved components to {}", config.output.path.display());
    Ok(())
}

async fn drive(
    config: &Config,
    session: &McpSession<StdioTransport>,
) -> Result<Envelope, SessionError> {
    session
        .settle(Duration::from_millis(config.session.startup_window_ms))
        .await?;

    match session.handshake().await {
        Ok(()) => {}
        Err(SessionError::Handshake(e)) => {
            tracing::warn!(error = %e, "handshake rejected, continuing degraded");
        }
        Err(e) => return Err(e),
    }

    let tools = session.list_tools().await?;
    if let Some(result) = &tools.result {
        match serde_json::from_value::<ToolsListResult>(result.clone()) {
            Ok(listed) => tracing::info!(tool_count = listed.tools.len(), "discovered tools"),
            Err(e) => tracing::debug!(error = %e, "unparseable tools/list result"),
        }
    }

    session
        .call_tool(&config.request.tool, config.request.arguments())
        .await
}

/// Write the response envelope as pretty-printed JSON, overwriting any
/// prior content at the path.
pub fn persist_response(path: &Path, response: &Envelope) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(response)?;
    std::fs::write(path, json)?;
    Ok(())
}
