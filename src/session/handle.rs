use tokio::sync::{mpsc, oneshot};

use super::{SessionEvent, SessionView};
use crate::error::{ExamError, Result};
use crate::proctor::Visibility;
use crate::report::ExamResult;

/// UI-facing side of a running session. Dropping it tears the session down.
pub struct SessionHandle {
    exam_id: String,
    events: mpsc::Sender<SessionEvent>,
    // Never sent on; the session watches for it being dropped.
    _teardown: oneshot::Sender<()>,
}

impl SessionHandle {
    pub(crate) fn new(
        exam_id: String,
        events: mpsc::Sender<SessionEvent>,
        teardown: oneshot::Sender<()>,
    ) -> Self {
        Self {
            exam_id,
            events,
            _teardown: teardown,
        }
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    async fn send(&self, event: SessionEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| ExamError::SessionClosed)
    }

    pub async fn set_answer(&self, text: impl Into<String>) -> Result<()> {
        self.send(SessionEvent::SetAnswer(text.into())).await
    }

    pub async fn go_next(&self) -> Result<()> {
        self.send(SessionEvent::GoNext).await
    }

    pub async fn go_prev(&self) -> Result<()> {
        self.send(SessionEvent::GoPrev).await
    }

    pub async fn select_question(&self, index: usize) -> Result<()> {
        self.send(SessionEvent::SelectQuestion(index)).await
    }

    pub async fn visibility_changed(&self, visibility: Visibility) -> Result<()> {
        self.send(SessionEvent::Visibility(visibility)).await
    }

    pub async fn submit(&self) -> Result<ExamResult> {
        let (reply, response) = oneshot::channel();
        self.send(SessionEvent::Submit(reply)).await?;
        response.await.map_err(|_| ExamError::SessionClosed)?
    }

    pub async fn snapshot(&self) -> Result<SessionView> {
        let (reply, response) = oneshot::channel();
        self.send(SessionEvent::Snapshot(reply)).await?;
        response.await.map_err(|_| ExamError::SessionClosed)
    }

    /// Releases camera, detector and alert channel, and waits until that is done.
    pub async fn shutdown(self) {
        let (reply, done) = oneshot::channel();
        if self.send(SessionEvent::Shutdown(reply)).await.is_ok() {
            let _ = done.await;
        }
    }
}
