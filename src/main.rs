use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scope_cache_key::{Config, Dialect, ScopeKeyComputer, SqliteStore};

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        error!("Failed to compute scope cache key: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    if config.database.dialect != Dialect::Sqlite {
        anyhow::bail!(
            "dialect {} needs an external connection; only sqlite databases can be opened here",
            config.database.dialect
        );
    }

    let scope = config.scope()?;
    let store = SqliteStore::open(&config.database.path)?;
    info!("Opened sqlite database at {}", config.database.path);

    let key = ScopeKeyComputer::new(&store).compute_key(&scope)?;
    println!("{}", key);
    Ok(())
}
