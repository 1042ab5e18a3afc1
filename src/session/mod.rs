pub mod handle;
pub mod manager;

pub use handle::*;
pub use manager::*;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::Result;
use crate::exam::{Question, SessionCounters, TimerState};
use crate::proctor::{AnalysisOutcome, Camera, ContentDetector, Detection, FrameDetector, Visibility};
use crate::report::ExamResult;
use crate::storage::ResultArchive;
use crate::websocket::{ActivityAlert, AlertChannel};

/// Everything that can change a session, applied one at a time in arrival order.
pub enum SessionEvent {
    SetAnswer(String),
    GoNext,
    GoPrev,
    SelectQuestion(usize),
    Visibility(Visibility),
    Detection(Detection),
    CameraRevoked,
    Analysis(AnalysisOutcome),
    RemoteAlert(ActivityAlert),
    Tick,
    Submit(oneshot::Sender<Result<ExamResult>>),
    Snapshot(oneshot::Sender<SessionView>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// External collaborators of one session.
#[derive(Clone)]
pub struct SessionDeps {
    pub camera: Arc<dyn Camera>,
    pub detector: Arc<dyn FrameDetector>,
    pub content: Arc<dyn ContentDetector>,
    pub alerts: Arc<dyn AlertChannel>,
    pub archive: ResultArchive,
}

/// Read-only picture of the session for rendering.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub exam_id: String,
    pub title: Option<String>,
    pub status: SessionStatus,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered: usize,
    pub current_question: Option<Question>,
    pub timer: TimerState,
    pub warnings: Vec<String>,
    pub counters: SessionCounters,
    pub ai_detected: bool,
    pub flagged: Vec<String>,
    pub face_present: bool,
    pub camera_active: bool,
    pub page_hidden: bool,
}
