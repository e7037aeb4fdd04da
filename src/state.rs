use std::env;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog;
use crate::config::{AppPaths, Settings};
use crate::errors::ApiError;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{ContextFormatter, Retriever, VectorStore};
use crate::recommendation::RecommendationService;

pub struct AppState {
    pub settings: Settings,
    pub store: Arc<VectorStore>,
    pub recommender: RecommendationService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Full startup sequence: configuration, catalog load and validation,
    /// index build-or-load, service wiring. Any DataError aborts here, with
    /// no partial initialization left behind.
    pub async fn initialize(paths: &AppPaths) -> Result<Arc<Self>, ApiError> {
        let settings = Settings::load(paths)?;
        settings.validate()?;

        let products = catalog::load_products(&paths.products_path)?;
        catalog::validate_products(&products)?;
        tracing::info!(products = products.len(), "product catalog loaded");

        let documents = catalog::documents_from_products(&products);

        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            settings.openai_base_url.clone(),
            settings.openai_api_key.clone().unwrap_or_default(),
        ));

        let force_recreate = env::var("PHARMAKON_REBUILD_INDEX").is_ok_and(|v| v == "1");
        let mut store = VectorStore::new(
            paths.index_db_path.clone(),
            provider.clone(),
            settings.embedding_model.clone(),
        );
        store.initialize(&documents, force_recreate).await?;
        tracing::info!(documents = store.count().await?, "vector store ready");
        let store = Arc::new(store);

        let retriever = Retriever::new(
            store.clone(),
            settings.default_top_k,
            settings.similarity_threshold,
        );
        let formatter = ContextFormatter::new(settings.description_preview_length);
        let recommender = RecommendationService::new(retriever, formatter, provider, &settings);

        Ok(Arc::new(AppState {
            settings,
            store,
            recommender,
            started_at: Utc::now(),
        }))
    }
}
