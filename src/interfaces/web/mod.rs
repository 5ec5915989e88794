mod handlers;
mod router;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::core::config::AppConfig;
use crate::core::store::Store;
use crate::core::training::TrainingProvider;
use crate::core::training::provider::HttpProvider;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<Store>,
    pub(crate) provider: Arc<dyn TrainingProvider>,
    pub(crate) webhook_secret: Option<String>,
    pub(crate) staleness_secs: i64,
}

/// Build the real store and provider client from config and serve the API.
/// Each request is an independent unit of work; there is no background
/// scheduler — polling is triggered by reads of stale jobs.
pub async fn serve(config: AppConfig) -> Result<()> {
    let store = Arc::new(Store::open(config.db_path())?);
    let provider: Arc<dyn TrainingProvider> = Arc::new(HttpProvider::new(&config.provider)?);

    if config.webhook_secret.is_none() {
        info!("No webhook secret configured; signatures will not be checked.");
    }

    let state = AppState {
        store,
        provider,
        webhook_secret: config.webhook_secret.clone(),
        staleness_secs: config.staleness_secs,
    };
    let app = router::build_api_router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("faceforge API running at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
