use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{CatalogStore, IngestPipeline};
use crate::core::config::{AppPaths, Settings};
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::memory::SessionMemory;
use crate::rag::{DocumentStore, IntentClassifier, RagEngine, SqliteDocumentStore};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes and background tasks.
///
/// Contains references to:
/// - Configuration and paths
/// - The product catalog and the document knowledge base
/// - Session memory and the answer engine
/// - The ingestion pipeline
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub memory: Arc<SessionMemory>,
    pub catalog: Arc<CatalogStore>,
    pub documents: Option<Arc<dyn DocumentStore>>,
    pub provider: Option<Arc<dyn LlmProvider>>,
    pub classifier: IntentClassifier,
    pub engine: Arc<RagEngine>,
    pub ingest: Arc<IngestPipeline>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// The catalog store is required and a failure there aborts startup.
    /// The document store and the model backend are optional: when either
    /// is missing the answer engine runs in degraded mode and ingestion
    /// skips document indexing, so the server still comes up.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let settings = Settings::load(&paths);

        let memory = Arc::new(SessionMemory::new(
            settings.memory.window,
            settings.memory.max_sessions,
            Duration::from_secs(settings.memory.idle_ttl_secs),
        ));

        let catalog = Arc::new(
            CatalogStore::new(paths.as_ref())
                .await
                .map_err(|e| InitializationError::Catalog(e.into()))?,
        );

        let documents: Option<Arc<dyn DocumentStore>> =
            match SqliteDocumentStore::new(paths.as_ref()).await {
                Ok(store) => Some(Arc::new(store)),
                Err(err) => {
                    tracing::warn!("document store unavailable, answers run degraded: {}", err);
                    None
                }
            };

        let connection = settings.llm.connection();
        let provider: Option<Arc<dyn LlmProvider>> = connection
            .as_ref()
            .map(|conn| {
                Arc::new(OpenAiCompatProvider::new(conn.base_url.clone())) as Arc<dyn LlmProvider>
            });

        match &provider {
            Some(p) => {
                let backend = p.clone();
                tokio::spawn(async move {
                    match backend.health_check().await {
                        Ok(true) => tracing::info!("model backend is reachable"),
                        Ok(false) => tracing::warn!("model backend reported unhealthy"),
                        Err(err) => tracing::warn!("model backend health check failed: {}", err),
                    }
                });
            }
            None => tracing::warn!(
                "no model backend configured, chat and ingestion will run degraded"
            ),
        }

        let chat_model = connection
            .as_ref()
            .map(|c| c.chat_model.clone())
            .unwrap_or_default();
        let embedding_model = connection
            .as_ref()
            .map(|c| c.embedding_model.clone())
            .unwrap_or_default();

        let classifier = IntentClassifier::new(provider.clone(), chat_model.clone());

        let engine = Arc::new(RagEngine::new(
            memory.clone(),
            documents.clone(),
            provider.clone(),
            chat_model,
            embedding_model.clone(),
            settings.rag.collection.clone(),
        ));

        let ingest = Arc::new(IngestPipeline::new(
            catalog.clone(),
            documents.clone(),
            provider.clone(),
            embedding_model,
            settings.rag.collection.clone(),
            settings.ingest.policy,
        ));

        Ok(Arc::new(AppState {
            paths,
            settings,
            memory,
            catalog,
            documents,
            provider,
            classifier,
            engine,
            ingest,
        }))
    }
}
