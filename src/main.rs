use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use palate_api::config::Config;
use palate_api::db;
use palate_api::routes::{create_router, AppState};
use palate_api::services::providers::{CatalogProvider, HistoryProvider, PostgresProvider};
use palate_api::services::{model, ModelHandle, RecommendOptions, Recommender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = db::create_pool(&config.database_url).await?;
    let redis_client = db::create_redis_client(&config.redis_url)?;
    let cache = db::Cache::new(redis_client);

    let provider = Arc::new(PostgresProvider::new(db_pool));
    let history: Arc<dyn HistoryProvider> = provider.clone();
    let catalog: Arc<dyn CatalogProvider> = provider;

    // CF models are built off the request path and swapped in whole, so
    // no request ever scores against a half-built matrix.
    let models = ModelHandle::new();
    tokio::spawn(model::run_rebuild_loop(
        history.clone(),
        catalog.clone(),
        models.clone(),
        config.cf_window_days,
        config.rebuild_interval_secs,
    ));

    let recommender = Recommender::new(
        history,
        catalog,
        cache,
        models,
        RecommendOptions {
            exclusion_window_days: config.exclusion_window_days,
        },
    );

    let state = AppState {
        recommender: Arc::new(recommender),
        default_limit: config.default_limit,
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "palate-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
