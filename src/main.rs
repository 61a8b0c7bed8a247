use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use freight_relay::adapters::auth::JwtSessionValidator;
use freight_relay::adapters::cache::CacheAside;
use freight_relay::adapters::http::middleware::ResponseCacheState;
use freight_relay::adapters::http::{build_router, AppServices, ProxyState};
use freight_relay::adapters::persistence::{InMemoryRealtimeStore, PostgresRealtimeStore};
use freight_relay::adapters::websocket::{InMemoryConnectionRegistry, RoomManager};
use freight_relay::application::{IdentityResolver, RealtimeHub};
use freight_relay::config::{AppConfig, ServerConfig};
use freight_relay::ports::RealtimeStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server)?;
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        "Starting freight-relay"
    );

    let cache = CacheAside::connect(&config.redis).await;
    let service_cache = CacheAside::connect(&config.redis).await;

    let store: Arc<dyn RealtimeStore> = match &config.database {
        Some(database) => Arc::new(PostgresRealtimeStore::connect_lazy(database)?),
        None => {
            tracing::warn!("No database configured, messages and notifications are kept in memory");
            Arc::new(InMemoryRealtimeStore::new())
        }
    };

    let validator = Arc::new(JwtSessionValidator::from_config(&config.auth));
    let identity = IdentityResolver::new(validator, cache.clone(), config.auth.token_cache_ttl())
        .with_demo_tokens(config.auth.allow_demo_tokens);
    if config.auth.allow_demo_tokens {
        tracing::warn!("Demo credentials are accepted without verification");
    }

    let registry = Arc::new(InMemoryConnectionRegistry::new());
    let rooms = Arc::new(RoomManager::new(registry));
    let hub = Arc::new(RealtimeHub::new(rooms, store));

    let proxy = ProxyState::from_config(&config.gateway)?;
    match &proxy {
        Some(proxy) => tracing::info!(upstream = %proxy.upstream(), "Gateway enabled"),
        None => tracing::info!("No upstream configured, /api/* is not served"),
    }

    let services = AppServices {
        hub,
        identity,
        response_cache: ResponseCacheState::from_config(cache.clone(), &config.gateway),
        cache,
        service_cache,
        proxy,
    };
    let app = build_router(&services, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

fn init_tracing(server: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&server.log_level)?,
    };
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
