//! Application state wiring the webhook guard and trigger service together.
//!
//! AppState holds the concrete service instances used by both CLI and HTTP
//! API. Services are generic over the repository trait; AppState pins them to
//! the SQLite implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hookgate_core::store::BoxCacheStore;
use hookgate_core::webhook::WebhookIngress;
use hookgate_core::workflow::{CanvasEngine, TriggerService};
use hookgate_infra::config::{global_secret, load_gateway_config, resolve_data_dir};
use hookgate_infra::sqlite::pool::{DatabasePool, database_url};
use hookgate_infra::sqlite::workflow::SqliteWorkflowRepository;
use hookgate_infra::store::build_cache_store;
use hookgate_types::config::GatewayConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteIngress = WebhookIngress<SqliteWorkflowRepository>;

pub type ConcreteTriggerService = TriggerService<SqliteWorkflowRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
    pub repo: Arc<SqliteWorkflowRepository>,
    pub store: BoxCacheStore,
    pub ingress: Arc<ConcreteIngress>,
    pub trigger: Arc<ConcreteTriggerService>,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_gateway_config(&data_dir, config_path).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        tracing::debug!(data_dir = %data_dir.display(), "application state initialized");
        Ok(Self::from_parts(config, data_dir, db_pool))
    }

    /// Wire services on top of an already opened database.
    pub fn from_parts(config: GatewayConfig, data_dir: PathBuf, db_pool: DatabasePool) -> Self {
        let repo = Arc::new(SqliteWorkflowRepository::new(db_pool.clone()));
        let store = build_cache_store(config.store.backend, &db_pool);

        let ingress = Arc::new(WebhookIngress::new(
            repo.clone(),
            store.clone(),
            &config.webhooks,
            global_secret(&config),
        ));

        let engine = Arc::new(CanvasEngine::from_settings(&config.engine));
        let trigger = Arc::new(TriggerService::new(repo.clone(), engine));

        Self {
            config: Arc::new(config),
            data_dir,
            db_pool,
            repo,
            store,
            ingress,
            trigger,
        }
    }
}
