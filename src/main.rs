use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use wedadmin::menu::{transfer, TransferFormat};
use wedadmin::{routes, storage, AppState, Config, MenuService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-help" || arg == "--help") {
        println!("Usage: wedadmin [OPTIONS]");
        println!("Options:");
        println!("  -config <path>  Path to configuration file (default: ./etc/wedadmin.toml)");
        println!("  -help, --help   Print this help message");
        return Ok(());
    }

    let config_path = args
        .iter()
        .skip_while(|arg| arg.as_str() != "-config")
        .nth(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "./etc/wedadmin.toml".to_string());

    // Load configuration first (before logging init)
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Could not load config file: {}, using defaults", e);
        Config::default()
    });

    // Initialize logging
    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting wedadmin server...");
    info!("Loading configuration from: {}", config_path);

    let repo = storage::open(&config).await?;
    let menus = MenuService::load(Arc::clone(&repo)).await?;

    if let Some(seed) = &config.storage.seed_file {
        seed_menus(&menus, seed).await?;
    }

    let state = AppState::new(menus, config.clone());
    let app = routes::create_router(state);

    let addr: SocketAddr = match config.addr.parse() {
        Ok(addr) => addr,
        Err(_) => {
            warn!("Invalid address '{}', using default 0.0.0.0:8080", config.addr);
            SocketAddr::from(([0, 0, 0, 0], 8080))
        }
    };

    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Import `path` when the store is still empty
async fn seed_menus(menus: &MenuService, path: &Path) -> anyhow::Result<()> {
    if !menus.read(|s| s.is_empty()).await {
        info!("Menus already present, skipping seed file {}", path.display());
        return Ok(());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let records = transfer::parse(&content, TransferFormat::from_path(path))?;
    let report = menus
        .mutate(|s| s.import(records))
        .await
        .map_err(|e| anyhow::anyhow!("Seeding from {} failed: {}", path.display(), e))?;

    info!("Seeded {} menus from {}", report.imported.len(), path.display());
    Ok(())
}
