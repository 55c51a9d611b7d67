//! Application state: the document store, the optional text generator and the
//! loaded configuration.
//!
//! Collaborators are held behind trait objects so handlers, the scheduler and
//! tests all go through the same seams.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::config::{load_config_from_env, AppConfig};
use crate::error::StoreError;
use crate::generator::TextGenerator;
use crate::openai::OpenAI;
use crate::store::{DocumentStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        config: AppConfig,
    ) -> Self {
        Self { store, generator, config: Arc::new(config) }
    }

    /// Build state from env: load config, open the store, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub async fn from_env() -> Result<Self, StoreError> {
        let config = load_config_from_env();

        let store = match &config.store.snapshot_path {
            Some(path) => MemoryStore::with_snapshot(path.clone()).await?,
            None => {
                info!(target: "skillboost_backend", "No snapshot_path configured; store is in-memory only");
                MemoryStore::new()
            }
        };

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "skillboost_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "skillboost_backend", "OpenAI disabled (no OPENAI_API_KEY). Cache misses will fail.");
        }
        let generator = openai.map(|oa| Arc::new(oa) as Arc<dyn TextGenerator>);

        info!(
            target: "skillboost_backend",
            categories = config.categories.len(),
            levels = ?config.levels,
            "Startup configuration"
        );
        Ok(Self::new(Arc::new(store), generator, config))
    }

    pub fn generator(&self) -> Option<&dyn TextGenerator> {
        self.generator.as_deref()
    }

    pub fn today(&self) -> NaiveDate {
        self.config.today()
    }
}
