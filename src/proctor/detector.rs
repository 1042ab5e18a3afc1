use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One captured video frame, encoded as the camera produced it (JPEG/PNG bytes).
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub face_detected: bool,
    pub multiple_faces: bool,
    pub phone_detected: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera access denied: {0}")]
    Denied(String),
    #[error("Camera access revoked")]
    Revoked,
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn request_access(&self) -> std::result::Result<(), CameraError>;
    /// `Ok(None)` while no frame is ready yet.
    async fn capture_frame(&self) -> std::result::Result<Option<Frame>, CameraError>;
    /// Stops every underlying track.
    fn stop(&self);
}

#[async_trait]
pub trait FrameDetector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> Result<Detection>;
    /// Called once when monitoring ends. Detectors holding a local model free it here.
    fn release(&self);
}

#[derive(Serialize)]
struct DetectRequest {
    image: String,
    timestamp: i64,
}

/// Face/phone detection backed by a remote inference endpoint.
#[derive(Clone)]
pub struct HttpFrameDetector {
    client: Client,
    base_url: String,
}

impl HttpFrameDetector {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FrameDetector for HttpFrameDetector {
    async fn detect(&self, frame: &Frame) -> Result<Detection> {
        let request = DetectRequest {
            image: base64::engine::general_purpose::STANDARD.encode(&frame.data),
            timestamp: frame.captured_at.timestamp_millis(),
        };

        let response = self
            .client
            .post(format!("{}/detect", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Detector API error: {}", error_text);
            return Err(anyhow::anyhow!("Detector API error: {}", error_text));
        }

        let detection: Detection = response.json().await?;
        debug!("Detection result: {:?}", detection);
        Ok(detection)
    }

    fn release(&self) {
        info!("🧹 Released remote detector at {}", self.base_url);
    }
}

/// Replays image files from a directory in name order, looping forever.
pub struct DirectoryCamera {
    frames: Vec<PathBuf>,
    next: AtomicUsize,
    stopped: AtomicBool,
}

impl DirectoryCamera {
    pub fn open(dir: &Path) -> std::result::Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Denied(format!("{}: {}", dir.display(), e)))?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("jpg") | Some("jpeg") | Some("png")
                )
            })
            .collect();
        frames.sort();

        info!("📷 Frame directory {} holds {} frames", dir.display(), frames.len());
        Ok(Self {
            frames,
            next: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Camera for DirectoryCamera {
    async fn request_access(&self) -> std::result::Result<(), CameraError> {
        if self.frames.is_empty() {
            return Err(CameraError::Denied("no frames available".to_string()));
        }
        Ok(())
    }

    async fn capture_frame(&self) -> std::result::Result<Option<Frame>, CameraError> {
        if self.stopped.load(Ordering::Relaxed) {
            return Err(CameraError::Revoked);
        }
        if self.frames.is_empty() {
            return Ok(None);
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        match tokio::fs::read(&self.frames[index]).await {
            Ok(data) => Ok(Some(Frame::new(data))),
            Err(e) => {
                error!("Failed to read frame {}: {}", self.frames[index].display(), e);
                Ok(None)
            }
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
        info!("📷 Camera tracks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_contract_field_names() {
        let detection: Detection = serde_json::from_str(
            r#"{"faceDetected": true, "multipleFaces": false, "phoneDetected": true}"#,
        )
        .unwrap();
        assert!(detection.face_detected);
        assert!(!detection.multiple_faces);
        assert!(detection.phone_detected);
    }

    #[tokio::test]
    async fn test_directory_camera_cycles_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"first").unwrap();
        std::fs::write(dir.path().join("b.png"), b"second").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let camera = DirectoryCamera::open(dir.path()).unwrap();
        camera.request_access().await.unwrap();

        let first = camera.capture_frame().await.unwrap().unwrap();
        let second = camera.capture_frame().await.unwrap().unwrap();
        let third = camera.capture_frame().await.unwrap().unwrap();
        assert_eq!(first.data, b"first");
        assert_eq!(second.data, b"second");
        assert_eq!(third.data, b"first");

        camera.stop();
        assert_eq!(camera.capture_frame().await.unwrap_err(), CameraError::Revoked);
    }

    #[tokio::test]
    async fn test_empty_directory_denies_access() {
        let dir = tempfile::tempdir().unwrap();
        let camera = DirectoryCamera::open(dir.path()).unwrap();
        assert!(matches!(
            camera.request_access().await,
            Err(CameraError::Denied(_))
        ));
    }
}
