use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use concierge_core::config::{AppConfig, ConfigError, LoadOptions};
use concierge_db::repositories::{SqlFulfillmentQueue, SqlRestaurantRepository};
use concierge_db::{connect_with_settings, migrations, DbPool};
use concierge_dialog::{Dispatcher, OffsetClock};
use concierge_fulfillment::{
    DeliveryError, HttpEmailTransport, HttpSearchIndex, Notifier, PollPolicy, RequestEmitter,
    SearchError, SuggestionWorker, WorkerRunner,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub dispatcher: Arc<Dispatcher>,
    pub worker_runner: Arc<WorkerRunner>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("search index client could not be constructed: {0}")]
    Search(#[source] SearchError),
    #[error("email transport could not be constructed: {0}")]
    Email(#[source] DeliveryError),
    #[error("invalid dialog timezone offset: {0} hours")]
    TimezoneOffset(i32),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let queue = Arc::new(SqlFulfillmentQueue::new(
        db_pool.clone(),
        Duration::from_secs(config.worker.visibility_timeout_secs),
    ));
    let restaurants = Arc::new(SqlRestaurantRepository::new(db_pool.clone()));
    let search =
        Arc::new(HttpSearchIndex::new(&config.search).map_err(BootstrapError::Search)?);
    let transport =
        Arc::new(HttpEmailTransport::new(&config.email).map_err(BootstrapError::Email)?);
    let notifier = Notifier::new(transport, config.email.subject.clone());

    let worker = Arc::new(SuggestionWorker::new(search, restaurants, notifier));
    let worker_runner = Arc::new(WorkerRunner::new(
        queue.clone(),
        worker,
        PollPolicy {
            batch_size: config.worker.batch_size,
            idle_backoff_ms: config.worker.idle_backoff_ms,
            max_idle_backoff_ms: config.worker.max_idle_backoff_ms,
            ..PollPolicy::default()
        },
    ));

    let clock = OffsetClock::from_hours(config.dialog.timezone_offset_hours)
        .ok_or(BootstrapError::TimezoneOffset(config.dialog.timezone_offset_hours))?;
    let dispatcher = Arc::new(Dispatcher::new(RequestEmitter::new(queue), Arc::new(clock)));

    Ok(Application { config, db_pool, dispatcher, worker_runner })
}
