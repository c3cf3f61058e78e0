use rmcp::{ServiceExt, transport::stdio};

use mockcat::config::Config;
use mockcat::server::MockcatServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    // Load .env from the binary's directory (MCP servers may start with any CWD).
    // Falls back to dotenvy's default CWD search if the binary path can't be resolved.
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.to_path_buf()));
    match exe_dir {
        Some(dir) if dir.join(".env").exists() => {
            dotenvy::from_path(dir.join(".env")).ok();
        }
        // Development builds: target/release/../../.env
        Some(dir) if dir.join("../../.env").exists() => {
            dotenvy::from_path(dir.join("../../.env")).ok();
        }
        _ => {
            dotenvy::dotenv().ok();
        }
    }

    tracing::info!("mockcat starting");

    let config = Config::load();
    let server = MockcatServer::new(config);

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("serving error: {e:?}"))?;

    service.waiting().await?;

    tracing::info!("mockcat shutting down");
    Ok(())
}
