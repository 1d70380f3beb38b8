use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::paths::AppPaths;

/// Runtime settings merged from an optional `config.yml` and environment
/// overrides. Every section has a usable default so the server can start
/// with no configuration at all; only the LLM connection gates readiness.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub memory: MemorySettings,
    pub rag: RagSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: Option<String>,
    pub chat_model: Option<String>,
    pub embedding_model: Option<String>,
}

/// Fully resolved LLM connection parameters. Present only when all three
/// values are configured; anything less leaves the knowledge base offline.
#[derive(Debug, Clone)]
pub struct LlmConnection {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl LlmSettings {
    pub fn connection(&self) -> Option<LlmConnection> {
        let base_url = non_empty(self.base_url.as_deref())?;
        let chat_model = non_empty(self.chat_model.as_deref())?;
        let embedding_model = non_empty(self.embedding_model.as_deref())?;
        Some(LlmConnection {
            base_url,
            chat_model,
            embedding_model,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Turns kept per session.
    pub window: usize,
    /// Upper bound on concurrently tracked sessions.
    pub max_sessions: u64,
    /// Sessions idle longer than this are evicted.
    pub idle_ttl_secs: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            window: 10,
            max_sessions: 10_000,
            idle_ttl_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub collection: String,
    pub default_k: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            collection: "products".to_string(),
            default_k: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub policy: IngestPolicy,
}

/// What ingestion does to the document collection after committing new
/// catalog rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestPolicy {
    /// Index documents for newly created products only.
    #[default]
    Append,
    /// Clear the collection and re-derive documents from the whole catalog.
    Replace,
}

impl Settings {
    pub fn load(paths: &AppPaths) -> Self {
        let mut settings = load_settings_file(&config_path(paths));
        settings.apply_env_overrides();
        settings
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("SHOPMATE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Ok(value) = env::var("SHOPMATE_CHAT_MODEL") {
            self.llm.chat_model = Some(value);
        }
        if let Ok(value) = env::var("SHOPMATE_EMBEDDING_MODEL") {
            self.llm.embedding_model = Some(value);
        }
        if let Ok(value) = env::var("PORT") {
            if let Ok(port) = value.parse::<u16>() {
                self.server.port = port;
            }
        }
    }
}

fn config_path(paths: &AppPaths) -> PathBuf {
    if let Ok(path) = env::var("SHOPMATE_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    let user_config = paths.user_data_dir.join("config.yml");
    if user_config.exists() {
        return user_config;
    }

    paths.project_root.join("config.yml")
}

fn load_settings_file(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Settings>(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(
                    "Ignoring malformed config file {}: {}",
                    path.display(),
                    err
                );
                Settings::default()
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), err);
            Settings::default()
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
