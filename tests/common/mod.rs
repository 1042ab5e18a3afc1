#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use examwatch_lib::config::ExamSettings;
use examwatch_lib::exam::{Assessment, Question};
use examwatch_lib::proctor::{
    Camera, CameraError, ContentDetector, Detection, Frame, FrameDetector, PlagiarismReport,
};
use examwatch_lib::session::SessionDeps;
use examwatch_lib::storage::{MemoryStore, ResultArchive};
use examwatch_lib::websocket::{ActivityAlert, AlertChannel, ChannelMessage, SuspiciousActivity};

pub struct FakeCamera {
    pub granted: bool,
    pub has_frames: bool,
    pub revoke_after: Option<usize>,
    pub captures: AtomicUsize,
    pub stopped: AtomicBool,
}

impl FakeCamera {
    /// Access granted, but no frame is ever ready, so the webcam monitor stays quiet.
    pub fn idle() -> Self {
        Self {
            granted: true,
            has_frames: false,
            revoke_after: None,
            captures: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn streaming() -> Self {
        Self {
            has_frames: true,
            ..Self::idle()
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: false,
            ..Self::idle()
        }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn request_access(&self) -> Result<(), CameraError> {
        if self.granted {
            Ok(())
        } else {
            Err(CameraError::Denied("user dismissed the prompt".to_string()))
        }
    }

    async fn capture_frame(&self) -> Result<Option<Frame>, CameraError> {
        let taken = self.captures.fetch_add(1, Ordering::SeqCst);
        if self.revoke_after.map_or(false, |limit| taken >= limit) {
            return Err(CameraError::Revoked);
        }
        if self.has_frames {
            Ok(Some(Frame::new(vec![0xFF, 0xD8])))
        } else {
            Ok(None)
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Plays back detections in order, then keeps repeating the last one.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Detection>>,
    last: Mutex<Detection>,
    pub released: AtomicBool,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Detection>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(face(true)),
            released: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FrameDetector for ScriptedDetector {
    async fn detect(&self, _frame: &Frame) -> Result<Detection> {
        let next = self.script.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(detection) = next {
            *last = detection;
        }
        Ok(*last)
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

pub fn face(present: bool) -> Detection {
    Detection {
        face_detected: present,
        ..Detection::default()
    }
}

pub struct FakeContent {
    pub ai: bool,
    pub plagiarism: PlagiarismReport,
    pub delay: Duration,
    pub fail_ai: bool,
    pub calls: AtomicUsize,
}

impl FakeContent {
    pub fn clean() -> Self {
        Self {
            ai: false,
            plagiarism: PlagiarismReport {
                is_plagiarized: false,
                similarity: 0.1,
            },
            delay: Duration::ZERO,
            fail_ai: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn ai_positive() -> Self {
        Self {
            ai: true,
            ..Self::clean()
        }
    }
}

#[async_trait]
impl ContentDetector for FakeContent {
    async fn detect_ai(&self, _text: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_ai {
            return Err(anyhow::anyhow!("AI detection service unavailable"));
        }
        Ok(self.ai)
    }

    async fn check_plagiarism(&self, _text: &str) -> Result<PlagiarismReport> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.plagiarism)
    }
}

pub struct RecordingAlerts {
    pub sent: Mutex<Vec<ChannelMessage>>,
    pub closed: AtomicBool,
    /// Records a report, then never finishes sending it.
    pub stalled: bool,
    inbound: Mutex<Option<mpsc::Receiver<ActivityAlert>>>,
    pub push: mpsc::Sender<ActivityAlert>,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        let (push, inbound) = mpsc::channel(16);
        Self {
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            stalled: false,
            inbound: Mutex::new(Some(inbound)),
            push,
        }
    }

    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Self::new()
        }
    }

    pub fn reported(&self) -> Vec<SuspiciousActivity> {
        self.sent
            .lock()
            .iter()
            .filter_map(|message| match message {
                ChannelMessage::SuspiciousActivity(activity) => Some(activity.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AlertChannel for RecordingAlerts {
    async fn join_exam(&self, exam_id: &str) -> Result<()> {
        self.sent
            .lock()
            .push(ChannelMessage::JoinExam(exam_id.to_string()));
        Ok(())
    }

    async fn report(&self, activity: SuspiciousActivity) -> Result<()> {
        self.sent
            .lock()
            .push(ChannelMessage::SuspiciousActivity(activity));
        if self.stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn take_alerts(&self) -> Option<mpsc::Receiver<ActivityAlert>> {
        self.inbound.lock().take()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub camera: Arc<FakeCamera>,
    pub detector: Arc<ScriptedDetector>,
    pub content: Arc<FakeContent>,
    pub alerts: Arc<RecordingAlerts>,
    pub archive: ResultArchive,
}

impl Harness {
    pub fn new(camera: FakeCamera, detector: ScriptedDetector, content: FakeContent) -> Self {
        Self {
            camera: Arc::new(camera),
            detector: Arc::new(detector),
            content: Arc::new(content),
            alerts: Arc::new(RecordingAlerts::new()),
            archive: ResultArchive::new(Arc::new(MemoryStore::new())),
        }
    }

    pub fn quiet() -> Self {
        Self::new(FakeCamera::idle(), ScriptedDetector::new(Vec::new()), FakeContent::clean())
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            camera: self.camera.clone(),
            detector: self.detector.clone(),
            content: self.content.clone(),
            alerts: self.alerts.clone(),
            archive: self.archive.clone(),
        }
    }
}

pub fn assessment(questions: usize) -> Assessment {
    Assessment {
        id: Some("exam-1".to_string()),
        title: Some("Rust fundamentals".to_string()),
        questions: (1..=questions)
            .map(|i| Question::new(i.to_string(), format!("Question {}", i)))
            .collect(),
        total_time: Some(30.0),
    }
}

pub fn settings() -> ExamSettings {
    ExamSettings::default()
}

/// Lets spawned analysis tasks finish without reaching the next one-second tick.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
