use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::ApiError;

/// Filesystem layout for catalog data, the persisted vector index and logs.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub products_path: PathBuf,
    pub index_db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        Self::from_data_dir(data_dir)
    }

    pub fn from_data_dir(data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");
        let products_path = data_dir.join("pharmakon_products.json");
        let index_db_path = data_dir.join("vectors.db");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            products_path,
            index_db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("PHARMAKON_DATA_DIR") {
        return PathBuf::from(dir);
    }

    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("data")
}

/// All tunables of the recommendation pipeline. Values come from an optional
/// `config.yml`, with environment overrides for deploy-specific secrets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model used to embed product descriptions and queries. Build and query
    /// must use the same model, so this is fixed for the lifetime of an index.
    pub embedding_model: String,
    /// Chat model used to phrase the final recommendation.
    pub llm_model: String,
    pub llm_temperature: f64,
    /// Number of nearest products considered per query.
    pub default_top_k: usize,
    /// Minimum cosine similarity a product must reach to be retrieved.
    pub similarity_threshold: f32,
    /// Char budget for product descriptions inside the prompt context.
    pub description_preview_length: usize,
    /// OpenAI-compatible endpoint root.
    pub openai_base_url: String,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            embedding_model: "text-embedding-3-large".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_temperature: 0.0,
            default_top_k: 2,
            similarity_threshold: 0.6,
            description_preview_length: 300,
            openai_base_url: "https://api.openai.com".to_string(),
            openai_api_key: None,
        }
    }
}

impl Settings {
    /// Load settings from `config.yml` under the data dir when present,
    /// then apply environment overrides.
    pub fn load(paths: &AppPaths) -> Result<Self, ApiError> {
        let config_path = paths.data_dir.join("config.yml");

        let mut settings = if config_path.exists() {
            let raw = fs::read_to_string(&config_path).map_err(ApiError::internal)?;
            Self::from_yaml_str(&raw)?
        } else {
            Settings::default()
        };

        if let Ok(url) = env::var("OPENAI_BASE_URL") {
            settings.openai_base_url = url;
        }
        settings.openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());

        Ok(settings)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ApiError> {
        serde_yaml::from_str(raw).map_err(ApiError::internal)
    }

    /// Fail fast on configuration the pipeline cannot run without.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.openai_api_key.is_none() {
            return Err(ApiError::Internal(
                "OPENAI_API_KEY not set; the embedding and generation calls require it".to_string(),
            ));
        }
        if self.default_top_k == 0 {
            return Err(ApiError::Internal(
                "default_top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
