#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::Parser;
use l10n_auth::Authenticator;
use l10n_bus::EventBus;
use l10n_cache::{CacheTier, LayeredCache, LocalCache, RedisCache};
use l10n_config::{load_config, validate_config};
use l10n_daemon::{AppState, build_app};
use l10n_engine::CatalogEngine;
use l10n_exchange::Exchange;
use l10n_store::{CatalogStore, SqliteStore};
use l10n_subscribe::SubscriptionManager;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "l10n-daemon", version, about = "Localization catalog service")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config.
    #[arg(long)]
    bind: Option<String>,

    /// Enable request/response debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("load config")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let filter = if args.debug {
        EnvFilter::new("l10n=debug,l10n_daemon=debug")
    } else {
        let level = config.log_level.as_deref().unwrap_or("info");
        EnvFilter::new(format!("l10n={level},l10n_daemon={level}"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for warning in validate_config(&config).context("validate config")? {
        warn!(%warning, "configuration warning");
    }

    let store: Arc<dyn CatalogStore> = Arc::new(
        SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("open store {}", config.database_url))?,
    );

    let shared_tier: Option<Arc<dyn CacheTier>> = match &config.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => {
                info!(url = %url, "shared cache tier connected");
                Some(Arc::new(cache))
            }
            Err(e) => {
                // Degrade to the local tier; the shared tier is an
                // optimization, not a dependency.
                warn!(url = %url, error = %e, "shared cache unavailable, continuing local-only");
                None
            }
        },
        None => None,
    };
    let cache = Arc::new(LayeredCache::new(
        LocalCache::new(config.local_cache_capacity, config.local_cache_max_entry_bytes),
        shared_tier,
    ));

    let bus = Arc::new(EventBus::with_capacity(config.event_bus_capacity));
    let engine = Arc::new(CatalogEngine::new(Arc::clone(&store), cache, Arc::clone(&bus)));
    let exchange = Arc::new(Exchange::new(store));
    let auth = Arc::new(Authenticator::new(
        config.jwt_secret.as_bytes(),
        config.admin_roles.clone(),
    ));

    let subscriptions = Arc::new(SubscriptionManager::new(config.subscriber_queue_capacity));
    tokio::spawn(Arc::clone(&subscriptions).run(Arc::clone(&bus)));

    let bind = config.bind.clone();
    let state = Arc::new(AppState {
        engine,
        exchange,
        auth,
        subscriptions,
        config: Arc::new(config),
    });
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(bind = %bind, "l10n-daemon listening");

    axum::serve(listener, app).await.context("serve")
}
