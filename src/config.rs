use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Ordered preference list of completion model candidates.
    #[serde(default = "default_model_candidates")]
    pub model_candidates: Vec<String>,
    /// Substrings marking a model id as a volatile alias that must never be
    /// cached as the resolved selection.
    #[serde(default = "default_volatile_markers")]
    pub volatile_markers: Vec<String>,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_model_candidates() -> Vec<String> {
    vec![
        "gemini-2.0-flash".into(),
        "gemini-2.0-flash-lite".into(),
        "gemini-2.5-flash".into(),
        "gemini-2.0-flash-exp".into(),
    ]
}

fn default_volatile_markers() -> Vec<String> {
    vec!["-exp".into(), "-latest".into()]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model_candidates: default_model_candidates(),
            volatile_markers: default_volatile_markers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Extra attempts against the same candidate on rate-limit-class errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_multiplier() -> u32 {
    2
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Most recent turns loaded into the prompt context.
    #[serde(default = "default_history_window")]
    pub window: usize,
}

fn default_history_window() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    5000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image service prompt endpoint; the encoded prompt is appended as a
    /// path segment.
    #[serde(default = "default_image_base_url")]
    pub base_url: String,
}

fn default_image_base_url() -> String {
    "https://image.pollinations.ai/prompt".into()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: default_image_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. `None` keeps everything in memory.
    #[serde(default)]
    pub db_path: Option<String>,
    /// Public base URL under which generated documents are served.
    #[serde(default = "default_generated_base_url")]
    pub generated_base_url: String,
}

fn default_generated_base_url() -> String {
    "http://127.0.0.1:5000/generated".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            generated_base_url: default_generated_base_url(),
        }
    }
}

impl Config {
    /// Load `~/.motherhive/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let workspace = workspace_dir()?;
        let config_path = workspace.join("config.toml");
        Self::load_or_init_at(&workspace, &config_path)
    }

    pub fn load_or_init_at(workspace: &Path, config_path: &Path) -> Result<Self, ConfigError> {
        fs::create_dir_all(workspace)?;

        let mut config = if config_path.exists() {
            let raw = fs::read_to_string(config_path)?;
            toml::from_str::<Self>(&raw).map_err(|e| ConfigError::Load(e.to_string()))?
        } else {
            let config = Self::default();
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| ConfigError::Load(e.to_string()))?;
            fs::write(config_path, rendered)?;
            config
        };

        config.workspace_dir = workspace.to_path_buf();
        config.config_path = config_path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.model_candidates.is_empty() {
            return Err(ConfigError::Validation(
                "api.model_candidates must not be empty".into(),
            ));
        }
        if self.reliability.multiplier == 0 {
            return Err(ConfigError::Validation(
                "reliability.multiplier must be at least 1".into(),
            ));
        }
        if self.history.window == 0 {
            return Err(ConfigError::Validation(
                "history.window must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// SQLite connection string for the configured storage.
    #[must_use]
    pub fn database_url(&self) -> String {
        match &self.storage.db_path {
            Some(path) => format!("sqlite://{path}?mode=rwc"),
            None => "sqlite::memory:".into(),
        }
    }
}

fn workspace_dir() -> Result<PathBuf, ConfigError> {
    let user_dirs =
        UserDirs::new().ok_or_else(|| ConfigError::Load("cannot resolve home directory".into()))?;
    Ok(user_dirs.home_dir().join(".motherhive"))
}
