use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};

pub mod config;
pub mod console;
pub mod error;
pub mod exam;
pub mod proctor;
pub mod report;
pub mod session;
pub mod storage;
pub mod websocket;

use config::ProctorConfig;
use exam::Assessment;
use proctor::{content_detector_from, Camera, DirectoryCamera, FrameDetector, HttpFrameDetector};
use session::{ExamSession, SessionDeps};
use storage::{JsonFileStore, ResultArchive};
use websocket::{AlertChannel, OfflineAlertChannel, SocketAlertChannel};

/// Builds the collaborators described by the configuration.
pub async fn connect_services(config: &ProctorConfig) -> Result<SessionDeps> {
    let frames_dir = config
        .camera
        .frames_dir
        .as_deref()
        .context("camera.frames_dir is not configured - camera access is required")?;
    let camera: Arc<dyn Camera> = Arc::new(DirectoryCamera::open(frames_dir)?);

    let detector_url = config
        .services
        .detector_url
        .clone()
        .context("services.detector_url is not configured")?;
    let detector: Arc<dyn FrameDetector> = Arc::new(HttpFrameDetector::new(
        detector_url,
        config.services.request_timeout(),
    ));

    let content = content_detector_from(
        config.services.content_url.as_deref(),
        config.services.content_api_key.clone(),
        config.services.request_timeout(),
    );

    let alerts: Arc<dyn AlertChannel> = match &config.socket.url {
        Some(url) => match SocketAlertChannel::connect(url).await {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                error!("Alert socket unavailable at {}: {}", url, e);
                Arc::new(OfflineAlertChannel)
            }
        },
        None => Arc::new(OfflineAlertChannel),
    };

    let store = JsonFileStore::open(&config.storage.path)?;
    let archive = ResultArchive::new(Arc::new(store));

    Ok(SessionDeps {
        camera,
        detector,
        content,
        alerts,
        archive,
    })
}

/// Runs one exam from an assessment file on the terminal.
pub async fn run(config: ProctorConfig, assessment_path: &Path) -> Result<()> {
    info!("ExamWatch starting with assessment {}", assessment_path.display());

    let raw = tokio::fs::read_to_string(assessment_path)
        .await
        .with_context(|| format!("Failed to read {}", assessment_path.display()))?;
    let assessment = Assessment::from_json(&raw).context("Invalid assessment payload")?;

    let deps = connect_services(&config).await?;
    let session = match ExamSession::start(assessment, deps, config.exam.clone()).await {
        Ok(session) => session,
        Err(e) => {
            warn!("📷 {}", e);
            println!("Camera access is required to take this exam. Grant access and start again.");
            return Err(e.into());
        }
    };

    let outcome = console::drive(&session).await;
    session.shutdown().await;
    outcome
}
