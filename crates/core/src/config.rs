//! Configuration management for the math tutor.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults (the reference deployment)
//! - Config file (`.mathtutor/config.yaml` under the workspace)
//! - Environment variables
//! - Command-line flags
//!
//! Credentials are never stored in the file. The file names the environment
//! variables that hold them and `AppConfig::require_credentials` resolves them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Directory under the workspace that holds config, locks and local indexes.
pub const STATE_DIR: &str = ".mathtutor";

const LLM_PROVIDERS: [&str; 2] = ["gemini", "ollama"];
const EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "hash"];
const INDEX_BACKENDS: [&str; 2] = ["qdrant", "sqlite"];
const SEARCH_PROVIDERS: [&str; 2] = ["serper", "static"];
const DISTANCES: [&str; 4] = ["cosine", "dot", "euclid", "manhattan"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .mathtutor/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub ingest: IngestSettings,
    pub search: SearchSettings,
}

/// Generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// "gemini" or "ollama"
    pub provider: String,
    pub model: String,
    /// Custom API base URL
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            endpoint: None,
            api_key_env: "GENAI_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl LlmSettings {
    /// Whether the configured provider refuses to run without a key.
    pub fn requires_api_key(&self) -> bool {
        self.provider.eq_ignore_ascii_case("gemini")
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// "ollama" or "hash"
    pub provider: String,
    pub model: String,
    /// Vector dimension D shared by every stored and queried vector
    pub dimensions: usize,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    /// Attempts per embedding request before giving up
    pub max_retries: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexSettings {
    /// "qdrant" or "sqlite"
    pub backend: String,
    /// Qdrant base URL
    pub url: String,
    pub collection: String,
    /// "cosine", "dot", "euclid" or "manhattan"
    pub distance: String,
    /// SQLite database file, relative to the workspace
    pub path: Option<PathBuf>,
    /// Environment variable holding the Qdrant API key, if any
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: "qdrant".to_string(),
            url: "http://localhost:6333".to_string(),
            collection: "math_qa".to_string(),
            distance: "cosine".to_string(),
            path: None,
            api_key_env: None,
            timeout_secs: 30,
        }
    }
}

/// Query-time retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub relevance_threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            relevance_threshold: 0.6,
        }
    }
}

/// Offline ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestSettings {
    /// Corpus directory or file, relative to the workspace
    pub corpus: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("knowledge_base"),
            chunk_size: 1000,
            chunk_overlap: 200,
            batch_size: 100,
        }
    }
}

/// Fallback web search settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    /// "serper" or "static"
    pub provider: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: "serper".to_string(),
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key_env: "SERPER_API_KEY".to_string(),
            timeout_secs: 15,
        }
    }
}

impl SearchSettings {
    /// Whether the configured provider refuses to run without a key.
    pub fn requires_api_key(&self) -> bool {
        self.provider.eq_ignore_ascii_case("serper")
    }
}

/// Secrets resolved at startup for the query path.
#[derive(Clone, Default)]
pub struct Credentials {
    pub llm_api_key: Option<String>,
    pub search_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "search_api_key",
                &self.search_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    index: Option<IndexSettings>,
    retrieval: Option<RetrievalSettings>,
    ingest: Option<IngestSettings>,
    search: Option<SearchSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            retrieval: RetrievalSettings::default(),
            ingest: IngestSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `MATHTUTOR_WORKSPACE`: Override workspace path
    /// - `MATHTUTOR_CONFIG`: Path to config file
    /// - `MATHTUTOR_LLM_PROVIDER` / `MATHTUTOR_LLM_MODEL`: Generative model
    /// - `MATHTUTOR_QDRANT_URL` / `MATHTUTOR_COLLECTION`: Vector index
    /// - `MATHTUTOR_CORPUS`: Ingestion corpus location
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with explicit workspace and config file paths.
    ///
    /// `None` falls back to the environment, then to defaults.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("MATHTUTOR_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("MATHTUTOR_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("MATHTUTOR_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("MATHTUTOR_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(url) = std::env::var("MATHTUTOR_QDRANT_URL") {
            config.index.url = url;
        }
        if let Ok(collection) = std::env::var("MATHTUTOR_COLLECTION") {
            config.index.collection = collection;
        }
        if let Some(corpus) = env_path("MATHTUTOR_CORPUS") {
            config.ingest.corpus = corpus;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(index) = config_file.index {
            result.index = index;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(ingest) = config_file.ingest {
            result.ingest = ingest;
        }
        if let Some(search) = config_file.search {
            result.search = search;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Get the path to the .mathtutor directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .mathtutor directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Directory holding ingestion lock files.
    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir().join("locks")
    }

    /// Corpus location resolved against the workspace.
    pub fn corpus_path(&self) -> PathBuf {
        self.resolve(&self.ingest.corpus)
    }

    /// SQLite index file resolved against the workspace.
    pub fn sqlite_index_path(&self) -> PathBuf {
        match &self.index.path {
            Some(path) => self.resolve(path),
            None => self.state_dir().join("index.sqlite"),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Resolve the optional Qdrant API key.
    pub fn index_api_key(&self) -> Option<String> {
        self.index.api_key_env.as_deref().and_then(read_secret)
    }

    /// Resolve the credentials the query path needs.
    ///
    /// Fails when a configured provider requires a key and its environment
    /// variable is unset or empty. Callers treat this as fatal at startup.
    pub fn require_credentials(&self) -> AppResult<Credentials> {
        let llm_api_key = read_secret(&self.llm.api_key_env);
        if self.llm.requires_api_key() && llm_api_key.is_none() {
            return Err(AppError::Config(format!(
                "Missing {} environment variable (required by LLM provider '{}')",
                self.llm.api_key_env, self.llm.provider
            )));
        }

        let search_api_key = read_secret(&self.search.api_key_env);
        if self.search.requires_api_key() && search_api_key.is_none() {
            return Err(AppError::Config(format!(
                "Missing {} environment variable (required by search provider '{}')",
                self.search.api_key_env, self.search.provider
            )));
        }

        Ok(Credentials {
            llm_api_key,
            search_api_key,
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        check_known("LLM provider", &self.llm.provider, &LLM_PROVIDERS)?;
        check_known(
            "embedding provider",
            &self.embedding.provider,
            &EMBEDDING_PROVIDERS,
        )?;
        check_known("index backend", &self.index.backend, &INDEX_BACKENDS)?;
        check_known("index distance", &self.index.distance, &DISTANCES)?;
        check_known("search provider", &self.search.provider, &SEARCH_PROVIDERS)?;

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.ingest.chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.ingest.batch_size == 0 {
            return Err(AppError::Config(
                "Batch size must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be greater than zero".to_string()));
        }
        if !self.retrieval.relevance_threshold.is_finite() {
            return Err(AppError::Config(
                "Relevance threshold must be a finite number".to_string(),
            ));
        }
        check_collection_name(&self.index.collection)?;

        Ok(())
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.iter().any(|k| k.eq_ignore_ascii_case(value)) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

/// Collection names end up in index REST paths and lock file names, so
/// they are restricted to ASCII letters, digits, `_` and `-`.
fn check_collection_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::Config("Collection name is empty".to_string()));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(AppError::Config(format!(
            "Collection name '{}' contains '{}'. Use letters, digits, '_' or '-'",
            name, bad
        )));
    }
    Ok(())
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

/// Read a secret from the environment, treating blank values as missing.
fn read_secret(env_name: &str) -> Option<String> {
    std::env::var(env_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, yaml: &str) {
        let state = dir.join(STATE_DIR);
        std::fs::create_dir_all(&state).unwrap();
        std::fs::write(state.join("config.yaml"), yaml).unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.index.collection, "math_qa");
        assert_eq!(config.index.distance, "cosine");
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.relevance_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.ingest.chunk_size, 1000);
        assert_eq!(config.ingest.chunk_overlap, 200);
        assert_eq!(config.ingest.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_state_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(STATE_DIR));
        assert!(config.locks_dir().ends_with("locks"));
    }

    #[test]
    fn test_load_merges_partial_yaml_sections() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"
index:
  backend: sqlite
  collection: algebra
retrieval:
  relevanceThreshold: 0.75
ingest:
  chunkSize: 500
  chunkOverlap: 50
logging:
  color: false
"#,
        );

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.index.backend, "sqlite");
        assert_eq!(config.index.collection, "algebra");
        // Fields missing from a section keep their defaults
        assert_eq!(config.index.distance, "cosine");
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.relevance_threshold - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.ingest.chunk_size, 500);
        assert_eq!(config.ingest.batch_size, 100);
        assert!(config.no_color);
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_paths_resolve_against_workspace() {
        let config = AppConfig {
            workspace: PathBuf::from("/srv/tutor"),
            ..AppConfig::default()
        };
        assert_eq!(config.corpus_path(), PathBuf::from("/srv/tutor/knowledge_base"));
        assert_eq!(
            config.sqlite_index_path(),
            PathBuf::from("/srv/tutor/.mathtutor/index.sqlite")
        );
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(None, true, false, true);
        assert!(config.verbose);
        assert!(config.log_json);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_chunk_size() {
        let mut config = AppConfig::default();
        config.ingest.chunk_overlap = config.ingest.chunk_size;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.index.distance = "hamming".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_collection_name() {
        for name in ["math_qa", "algebra-2", "Q1"] {
            let mut config = AppConfig::default();
            config.index.collection = name.to_string();
            assert!(config.validate().is_ok(), "{} should be accepted", name);
        }

        for name in ["", "  ", "math/qa", "../points", "a b", "qa?wait=true", "ünïcode"] {
            let mut config = AppConfig::default();
            config.index.collection = name.to_string();
            assert!(
                matches!(config.validate(), Err(AppError::Config(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_require_credentials_missing_llm_key() {
        let mut config = AppConfig::default();
        config.llm.api_key_env = "MATHTUTOR_TEST_UNSET_LLM_KEY".to_string();
        config.search.provider = "static".to_string();

        let err = config.require_credentials().unwrap_err();
        assert!(err.to_string().contains("MATHTUTOR_TEST_UNSET_LLM_KEY"));
    }

    #[test]
    fn test_require_credentials_missing_search_key() {
        std::env::set_var("MATHTUTOR_TEST_LLM_KEY_PRESENT", "secret");
        let mut config = AppConfig::default();
        config.llm.api_key_env = "MATHTUTOR_TEST_LLM_KEY_PRESENT".to_string();
        config.search.api_key_env = "MATHTUTOR_TEST_UNSET_SEARCH_KEY".to_string();

        let err = config.require_credentials().unwrap_err();
        assert!(err.to_string().contains("MATHTUTOR_TEST_UNSET_SEARCH_KEY"));
    }

    #[test]
    fn test_keyless_providers_need_no_credentials() {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        config.llm.api_key_env = "MATHTUTOR_TEST_UNSET_A".to_string();
        config.search.provider = "static".to_string();
        config.search.api_key_env = "MATHTUTOR_TEST_UNSET_B".to_string();

        let creds = config.require_credentials().unwrap();
        assert!(creds.llm_api_key.is_none());
        assert!(creds.search_api_key.is_none());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials {
            llm_api_key: Some("super-secret".to_string()),
            search_api_key: None,
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
