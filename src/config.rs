use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Shared GM secret. Gates the GM HTTP routes and binds the GM role
    /// on the realtime channel at handshake time.
    pub password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            password: "changeme".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one JSON file per scene.
    pub data_dir: String,
    /// Directory for uploaded token media (images/videos).
    pub upload_dir: String,
    /// Directory for uploaded music files.
    pub music_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/scenes".to_string(),
            upload_dir: "public/uploads".to_string(),
            music_dir: "public/music".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AutosaveConfig {
    pub interval_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub filters: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_str = std::fs::read_to_string("config.toml").unwrap_or_else(|_| "".to_string());
        if config_str.is_empty() {
            return Err("config.toml not found or empty".into());
        }
        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn log_filter(&self) -> String {
        let level = self
            .logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info");

        match self.logging.as_ref().and_then(|l| l.filters.as_deref()) {
            Some(filters) if !filters.is_empty() => format!("{},{}", level, filters),
            _ => level.to_string(),
        }
    }
}
