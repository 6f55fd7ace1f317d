use crate::review::publisher::PublishSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Review export configuration
/// In debug builds: `.env` is loaded first, then `REVIEW_*` variables apply
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name shown in the host's export menu; also namespaces cached presets
    pub menu_name: String,
    /// Parent entity type versions are linked to
    pub entity_type: String,
    pub project_id: i64,
    pub sequence_task_template: Option<String>,
    pub version_task_template: Option<String>,
    /// Upload already-encoded media and skip server-side transcoding
    pub bypass_server_transcoding: bool,
    /// Let the host render review movies as background jobs
    pub background_export: bool,
    /// Where the host writes movies before upload
    pub target_location: PathBuf,
    pub destination_host: String,
    /// Where generated export presets are written
    pub cache_location: PathBuf,
    pub read_frame_path: PathBuf,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub department: String,
    pub user_id: Option<i64>,
    pub remote_url: String,
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            menu_name: "Submit to Review".to_string(),
            entity_type: "Sequence".to_string(),
            project_id: 0,
            sequence_task_template: None,
            version_task_template: None,
            bypass_server_transcoding: false,
            background_export: true,
            target_location: std::env::temp_dir(),
            destination_host: "localhost".to_string(),
            cache_location: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("review_export"),
            read_frame_path: PathBuf::from("read_frame"),
            thumbnail_width: 1280,
            thumbnail_height: 720,
            department: "Flame".to_string(),
            user_id: None,
            remote_url: "http://localhost:8000/api/v1".to_string(),
            api_key: None,
        }
    }
}

impl Config {
    /// Load configuration: optional `.env`, then environment variables
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(debug_assertions)]
        {
            if dotenvy::dotenv().is_ok() {
                tracing::info!("Config: Dev mode activated - loaded .env file");
            } else {
                tracing::debug!("Config: No .env file found");
            }
        }

        let config = Self::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `REVIEW_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("REVIEW_MENU_NAME") {
            config.menu_name = v;
        }
        if let Some(v) = lookup("REVIEW_ENTITY_TYPE") {
            config.entity_type = v;
        }
        if let Some(v) = lookup("REVIEW_PROJECT_ID") {
            config.project_id = parse("REVIEW_PROJECT_ID", &v)?;
        }
        config.sequence_task_template = lookup("REVIEW_SEQUENCE_TASK_TEMPLATE")
            .filter(|v| !v.is_empty())
            .or(config.sequence_task_template);
        config.version_task_template = lookup("REVIEW_VERSION_TASK_TEMPLATE")
            .filter(|v| !v.is_empty())
            .or(config.version_task_template);
        if let Some(v) = lookup("REVIEW_BYPASS_SERVER_TRANSCODING") {
            config.bypass_server_transcoding = parse_bool("REVIEW_BYPASS_SERVER_TRANSCODING", &v)?;
        }
        if let Some(v) = lookup("REVIEW_BACKGROUND_EXPORT") {
            config.background_export = parse_bool("REVIEW_BACKGROUND_EXPORT", &v)?;
        }
        if let Some(v) = lookup("REVIEW_TARGET_LOCATION") {
            config.target_location = PathBuf::from(v);
        }
        if let Some(v) = lookup("REVIEW_DESTINATION_HOST") {
            config.destination_host = v;
        }
        if let Some(v) = lookup("REVIEW_CACHE_LOCATION") {
            config.cache_location = PathBuf::from(v);
        }
        if let Some(v) = lookup("REVIEW_READ_FRAME_PATH") {
            config.read_frame_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("REVIEW_THUMBNAIL_WIDTH") {
            config.thumbnail_width = parse("REVIEW_THUMBNAIL_WIDTH", &v)?;
        }
        if let Some(v) = lookup("REVIEW_THUMBNAIL_HEIGHT") {
            config.thumbnail_height = parse("REVIEW_THUMBNAIL_HEIGHT", &v)?;
        }
        if let Some(v) = lookup("REVIEW_DEPARTMENT") {
            config.department = v;
        }
        if let Some(v) = lookup("REVIEW_USER_ID") {
            config.user_id = Some(parse("REVIEW_USER_ID", &v)?);
        }
        if let Some(v) = lookup("REVIEW_REMOTE_URL") {
            config.remote_url = v;
        }
        config.api_key = lookup("REVIEW_API_KEY").or(config.api_key);

        Ok(config)
    }

    /// Load a JSON configuration document. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Entity type cannot be empty".to_string(),
            ));
        }
        if self.menu_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Menu name cannot be empty".to_string(),
            ));
        }
        if self.thumbnail_width == 0 || self.thumbnail_height == 0 {
            return Err(ConfigError::Validation(
                "Thumbnail bounds must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            entity_type: self.entity_type.clone(),
            project_id: self.project_id,
            sequence_task_template: self.sequence_task_template.clone(),
            version_task_template: self.version_task_template.clone(),
            bypass_server_transcoding: self.bypass_server_transcoding,
            department: self.department.clone(),
            user_id: self.user_id,
            thumbnail_width: self.thumbnail_width,
            thumbnail_height: self.thumbnail_height,
        }
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
