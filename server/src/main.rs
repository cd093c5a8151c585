use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod ai;
mod cache;
mod config;
mod controller;
mod proxy;
mod query_key;
mod routes;
#[cfg(test)]
mod test_support;

use ai::GeminiClient;
use cache::{memory::MemoryMovieCache, sqlite::SqliteMovieCache, MovieCache};
use config::Config;
use controller::{FormController, Messages, SystemClock};
use proxy::ProxyClient;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "birth_month_movie_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    config.warn_missing_credentials();

    let cache = open_cache(&config).await?;
    let oracle = Arc::new(GeminiClient::new(&config)?);
    let controller = Arc::new(FormController::new(
        cache,
        oracle,
        Arc::new(SystemClock),
        Messages::default(),
    ));
    let proxy = Arc::new(ProxyClient::new(&config)?);

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        controller,
        proxy,
    };

    let app: Router = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_cache(config: &Config) -> anyhow::Result<Arc<dyn MovieCache>> {
    if config.uses_memory_store() {
        tracing::info!("Using in-memory movie cache");
        return Ok(Arc::new(MemoryMovieCache::new()));
    }

    let pool = sqlx::SqlitePool::connect(&config.database_url).await?;
    let cache = SqliteMovieCache::new(pool);
    cache.init_tables().await?;
    let entries = cache.count().await?;
    tracing::info!(entries, "Movie cache ready");

    Ok(Arc::new(cache))
}
