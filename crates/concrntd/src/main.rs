//! concrntd: the concrnt node daemon.
//!
//! Loads `NodeConfig` from a YAML file, connects the SurrealDB-backed
//! store, wires the commit pipeline and chunkline engine into `AppState`,
//! and serves the HTTP/WebSocket surface (spec §6).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use concrnt_core::config::DEFAULT_CONFIG_PATH;
use concrnt_core::NodeConfig;
use concrnt_store::SurrealHandle;
use concrntd::routes;
use concrntd::state::AppState;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "concrntd")]
#[command(author = "Concrnt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "concrnt node daemon", long_about = None)]
struct Cli {
    /// Path to the node's YAML config file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: std::path::PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    concrnt_core::init_tracing(cli.json, level);

    let config = NodeConfig::load(&cli.config).context("failed to load node config")?;
    let port = config.port;

    let db = SurrealHandle::connect(&config.dsn)
        .await
        .context("failed to connect to node database")?;
    let db = Arc::new(db);

    let state = Arc::new(AppState::new(config, db.clone(), db));

    info!(csid = %state.csid, port, "concrnt node starting");

    let app = routes::build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .context("failed to bind listener")?;

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn cli_parses_default_config_path() {
        let cli = Cli::parse_from(["concrntd"]);
        assert_eq!(
            cli.config,
            std::path::PathBuf::from(concrnt_core::config::DEFAULT_CONFIG_PATH)
        );
    }

    #[test]
    fn cli_parses_verbose_and_json_flags() {
        let cli = Cli::parse_from(["concrntd", "--verbose", "--json"]);
        assert!(cli.verbose);
        assert!(cli.json);
    }
}
