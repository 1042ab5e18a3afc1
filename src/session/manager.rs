use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};

use super::{SessionDeps, SessionEvent, SessionHandle, SessionStatus, SessionView};
use crate::config::ExamSettings;
use crate::error::{ExamError, Result};
use crate::exam::{Assessment, ExamState, ExamTimer};
use crate::proctor::{
    self, FaceTracker, Visibility, VisibilityWatcher, AI_CONTENT_WARNING,
};
use crate::report::{build_result, ExamResult, RecentActivity, ResultInput};
use crate::websocket::{ActivityKind, AlertChannel, SuspiciousActivity};

const EVENT_QUEUE_SIZE: usize = 256;
const REPORT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);
pub const TIME_UP_WARNING: &str = "Time is up";
pub const FACE_MISSING_MESSAGE: &str = "Face not detected in camera frame";
pub const MULTIPLE_FACES_MESSAGE: &str = "Multiple faces detected";

/// Owns all state of one exam attempt. Runs as a single task fed by the event queue.
pub struct ExamSession {
    exam_id: String,
    title: Option<String>,
    state: ExamState,
    timer: ExamTimer,
    tracker: FaceTracker,
    visibility: VisibilityWatcher,
    deps: SessionDeps,
    settings: ExamSettings,
    events: mpsc::Sender<SessionEvent>,
    reports: Option<mpsc::UnboundedSender<SuspiciousActivity>>,
    reporter: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    alert_forwarder: Option<JoinHandle<()>>,
    camera_active: bool,
    closed: bool,
}

impl ExamSession {
    /// Requests camera access, announces the exam and starts monitoring.
    pub async fn start(
        assessment: Assessment,
        deps: SessionDeps,
        settings: ExamSettings,
    ) -> Result<SessionHandle> {
        deps.camera
            .request_access()
            .await
            .map_err(|e| ExamError::CameraAccessDenied(e.to_string()))?;

        let exam_id = assessment.exam_id();
        let duration = assessment.duration_secs(settings.default_duration_secs);
        info!(
            "🎬 Starting exam {} ({} questions, {}s)",
            exam_id,
            assessment.questions.len(),
            duration
        );

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        if let Err(e) = deps.alerts.join_exam(&exam_id).await {
            error!("Failed to announce exam {}: {}", exam_id, e);
        }

        let alert_forwarder = deps.alerts.take_alerts().map(|mut alerts| {
            let events = events_tx.clone();
            tokio::spawn(async move {
                while let Some(alert) = alerts.recv().await {
                    if events.send(SessionEvent::RemoteAlert(alert)).await.is_err() {
                        break;
                    }
                }
            })
        });

        let poller = proctor::spawn_poller(
            deps.camera.clone(),
            deps.detector.clone(),
            settings.poll_interval(),
            events_tx.clone(),
        );
        let (reports, reporter) = spawn_reporter(deps.alerts.clone());

        let mut state = ExamState::new(assessment.questions);
        let mut timer = ExamTimer::new(duration);
        timer.start();
        // A zero-length exam is over before the first tick.
        let ticker = if timer.is_expired() {
            warn!("⏰ Exam {} has no time allotted", exam_id);
            state.push_warning(TIME_UP_WARNING);
            None
        } else {
            Some(spawn_ticker(events_tx.clone()))
        };

        let (teardown_tx, teardown_rx) = oneshot::channel();
        let session = ExamSession {
            exam_id: exam_id.clone(),
            title: assessment.title,
            state,
            timer,
            tracker: FaceTracker::new(),
            visibility: VisibilityWatcher::new(),
            deps,
            settings,
            events: events_tx.clone(),
            reports: Some(reports),
            reporter: Some(reporter),
            poller: Some(poller),
            ticker,
            alert_forwarder,
            camera_active: true,
            closed: false,
        };
        tokio::spawn(session.run(events_rx, teardown_rx));

        Ok(SessionHandle::new(exam_id, events_tx, teardown_tx))
    }

    /// Ends on an explicit shutdown, or as soon as the handle's teardown sender is dropped.
    async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut handle_dropped: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(SessionEvent::Shutdown(reply)) => {
                        self.teardown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = &mut handle_dropped => {
                    debug!("Handle for session {} dropped", self.exam_id);
                    break;
                }
            }
        }
        self.teardown().await;
        debug!("Session {} event loop finished", self.exam_id);
    }

    fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SetAnswer(text) => self.on_answer(text),
            SessionEvent::GoNext => self.state.go_next(),
            SessionEvent::GoPrev => self.state.go_prev(),
            SessionEvent::SelectQuestion(index) => self.state.select_question(index),
            SessionEvent::Visibility(next) => {
                let monitoring = !self.state.is_completed();
                if self.visibility.observe(next, monitoring) {
                    self.state.record_tab_switch();
                }
            }
            SessionEvent::Detection(detection) => {
                if self.state.is_completed() || !self.camera_active {
                    return;
                }
                let findings = self.tracker.observe(detection);
                if findings.face_lost {
                    self.state.record_out_of_frame();
                    self.report(ActivityKind::FaceNotDetected, FACE_MISSING_MESSAGE);
                }
                if findings.multiple_faces {
                    self.report(ActivityKind::MultipleFaces, MULTIPLE_FACES_MESSAGE);
                }
                if findings.phone_detected {
                    self.state.record_phone_usage();
                }
            }
            SessionEvent::CameraRevoked => {
                warn!("📷 Camera access revoked during exam {}", self.exam_id);
                self.release_camera();
            }
            SessionEvent::Analysis(outcome) => {
                if self.state.is_completed() {
                    debug!(
                        "Dropping analysis for question {} that finished after submission",
                        outcome.question_id
                    );
                    return;
                }
                if outcome.ai_generated {
                    self.state.mark_ai_detected();
                    self.state.push_warning(AI_CONTENT_WARNING);
                    self.report(ActivityKind::AiContent, AI_CONTENT_WARNING);
                }
                if let Some(report) = outcome.plagiarism_flagged() {
                    let warning = report.warning();
                    self.state.push_warning(warning.clone());
                    self.report(ActivityKind::Plagiarism, warning);
                }
            }
            SessionEvent::RemoteAlert(alert) => {
                if self.state.is_completed() {
                    debug!("Ignoring alert after completion: {}", alert.message);
                } else {
                    self.state.push_warning(alert.message);
                }
            }
            SessionEvent::Tick => {
                if !self.state.is_completed() && self.timer.tick() {
                    self.state.push_warning(TIME_UP_WARNING);
                    if let Some(ticker) = self.ticker.take() {
                        ticker.abort();
                    }
                }
            }
            SessionEvent::Submit(reply) => {
                let outcome = self.submit();
                let _ = reply.send(outcome);
            }
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.view());
            }
            SessionEvent::Shutdown(_) => {}
        }
    }

    fn on_answer(&mut self, text: String) {
        let Some(question_id) = self.state.set_answer(&text) else {
            return;
        };
        if proctor::should_analyze(&text, self.settings.analysis_min_chars) {
            proctor::spawn_analysis(
                self.deps.content.clone(),
                question_id,
                text,
                self.events.clone(),
            );
        }
    }

    /// Queues the report for the reporter task; never waits on the channel.
    fn report(&self, kind: ActivityKind, message: impl Into<String>) {
        let Some(reports) = &self.reports else {
            return;
        };
        if reports.send(SuspiciousActivity::new(kind, message)).is_err() {
            warn!("Activity reporter for exam {} is gone", self.exam_id);
        }
    }

    fn submit(&mut self) -> Result<ExamResult> {
        if self.state.is_completed() {
            return Err(ExamError::AlreadyCompleted);
        }
        if let Err(flagged) = self.state.validate_answers() {
            info!("📝 Submission blocked, unanswered: {}", flagged.join(", "));
            return Err(ExamError::IncompleteAnswers { flagged });
        }

        self.state.complete();
        self.release_camera();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.timer.stop();

        let result = build_result(ResultInput {
            exam_id: &self.exam_id,
            questions: self.state.questions(),
            warnings: self.state.warnings(),
            counters: self.state.counters(),
            ai_detected: self.state.ai_detected(),
            time_taken_secs: self.timer.elapsed_seconds(),
        });

        if let Err(e) = self.deps.archive.record_result(&result) {
            error!("Failed to store exam result {}: {}", result.id, e);
        }
        if result.is_high_risk() {
            if let Err(e) = self
                .deps
                .archive
                .record_activity(RecentActivity::high_risk(&result))
            {
                error!("Failed to store high risk activity: {}", e);
            }
        }

        info!("📤 Exam {} submitted as result {}", self.exam_id, result.id);
        Ok(result)
    }

    /// Stops polling, camera tracks and the detector. Safe to call repeatedly.
    fn release_camera(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
        if self.camera_active {
            self.camera_active = false;
            self.deps.camera.stop();
            self.deps.detector.release();
            info!("🎥 Webcam monitor stopped for exam {}", self.exam_id);
        }
    }

    async fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.release_camera();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(forwarder) = self.alert_forwarder.take() {
            forwarder.abort();
        }
        // Closing the queue lets the reporter drain what is already queued.
        self.reports = None;
        if let Some(mut reporter) = self.reporter.take() {
            if timeout(REPORT_FLUSH_TIMEOUT, &mut reporter).await.is_err() {
                warn!("📡 Dropping unsent activity reports for exam {}", self.exam_id);
                reporter.abort();
            }
        }
        self.deps.alerts.close().await;
        info!("👋 Session {} closed", self.exam_id);
    }

    fn view(&self) -> SessionView {
        SessionView {
            exam_id: self.exam_id.clone(),
            title: self.title.clone(),
            status: if self.state.is_completed() {
                SessionStatus::Completed
            } else {
                SessionStatus::Active
            },
            current_index: self.state.current_index(),
            total_questions: self.state.questions().len(),
            answered: self.state.answered_count(),
            current_question: self.state.current_question().cloned(),
            timer: self.timer.state(),
            warnings: self.state.warnings().to_vec(),
            counters: self.state.counters(),
            ai_detected: self.state.ai_detected(),
            flagged: self.state.flagged().to_vec(),
            face_present: self.tracker.face_present(),
            camera_active: self.camera_active,
            page_hidden: self.visibility.current() == Visibility::Hidden,
        }
    }
}

fn spawn_reporter(
    alerts: Arc<dyn AlertChannel>,
) -> (mpsc::UnboundedSender<SuspiciousActivity>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<SuspiciousActivity>();
    let reporter = tokio::spawn(async move {
        while let Some(activity) = rx.recv().await {
            if let Err(e) = alerts.report(activity).await {
                error!("Failed to report suspicious activity: {}", e);
            }
        }
    });
    (tx, reporter)
}

fn spawn_ticker(events: mpsc::Sender<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            if events.send(SessionEvent::Tick).await.is_err() {
                break;
            }
        }
    })
}
