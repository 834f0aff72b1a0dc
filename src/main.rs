use tracing_subscriber::EnvFilter;

use blueprint_client::config::Config;
use blueprint_client::orchestrate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("blueprint_client=info,bp_mcp_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Config ─────────────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "blueprint.toml".into());

    let config = Config::load_or_default(&config_path);
    tracing::info!(
        command = %config.server.command,
        tool = %config.request.tool,
        output = %config.output.path.display(),
        "configuration loaded"
    );

    orchestrate::run(&config).await
}
