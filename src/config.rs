use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use log::{info, warn};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "examwatch";
const ENV_PREFIX: &str = "EXAMWATCH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    pub exam: ExamSettings,
    pub services: ServiceSettings,
    pub socket: SocketSettings,
    pub storage: StorageSettings,
    pub camera: CameraSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExamSettings {
    /// Webcam polling period in milliseconds
    pub poll_interval_ms: u64,
    /// Answers must be strictly longer than this (in chars) to be analyzed
    pub analysis_min_chars: usize,
    /// Used when the assessment carries no `totalTime`
    pub default_duration_secs: u64,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            analysis_min_chars: 30,
            default_duration_secs: 3600,
        }
    }
}

impl ExamSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub detector_url: Option<String>,
    pub content_url: Option<String>,
    pub content_api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            detector_url: None,
            content_url: None,
            content_api_key: None,
            request_timeout_secs: 15,
        }
    }
}

impl ServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SocketSettings {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("examwatch-storage.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub frames_dir: Option<PathBuf>,
}

impl ProctorConfig {
    /// Layers `.env`, an optional config file and `EXAMWATCH__*` variables over the defaults.
    pub fn load(file: &str) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            info!("No .env file loaded ({}), using process environment", e);
        }

        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file))?;

        let config: ProctorConfig = settings
            .try_deserialize()
            .context("Invalid examwatch configuration")?;

        config.log_status();
        Ok(config)
    }

    fn log_status(&self) {
        info!("⚙️ Webcam poll interval: {}ms", self.exam.poll_interval_ms);
        info!("⚙️ Storage file: {}", self.storage.path.display());
        match &self.services.content_url {
            Some(url) if self.services.content_api_key.is_some() => {
                info!("✅ Content detection service: {}", url)
            }
            Some(url) => info!("✅ Content detection service (no API key): {}", url),
            None => warn!("⚠️ No content detection service configured - answer analysis disabled"),
        }
        if self.socket.url.is_none() {
            warn!("⚠️ No alert socket configured - running offline");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_exam_rules() {
        let config = ProctorConfig::default();
        assert_eq!(config.exam.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.exam.analysis_min_chars, 30);
        assert_eq!(config.exam.default_duration_secs, 3600);
        assert!(config.socket.url.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examwatch.toml");
        std::fs::write(
            &path,
            "[exam]\npoll_interval_ms = 250\n\n[socket]\nurl = \"ws://localhost:3000\"\n",
        )
        .unwrap();

        let config = ProctorConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.exam.poll_interval_ms, 250);
        assert_eq!(config.exam.analysis_min_chars, 30);
        assert_eq!(config.socket.url.as_deref(), Some("ws://localhost:3000"));
    }
}
