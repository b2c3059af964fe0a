//! MockServe — mock backend for frontend development.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                println!("MockServe — mock backend for frontend development");
                println!();
                println!("Usage: mockserve");
                println!();
                println!("Environment:");
                println!("  PORT                  HTTP port (default 3000)");
                println!("  BATCH_QUIET_MS        /stats batch quiet period (default 1000)");
                println!("  BATCH_JITTER_MIN_MS   /stats minimum redispatch delay (default 1000)");
                println!("  BATCH_JITTER_MAX_MS   /stats maximum redispatch delay (default 3000)");
                println!("  STATS_TIMEOUT_MS      /stats wait limit (default: none)");
                println!("  SLOW_DELAY_MS         /slow response delay (default 2000)");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'mockserve help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let config = mockserve_core::MockServeConfig::from_env()?;
    let port = config.port;

    let state = Arc::new(AppState::new(config)?);
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://localhost:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
