use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    FaceNotDetected,
    MultipleFaces,
    AiContent,
    Plagiarism,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SuspiciousActivity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
}

impl SuspiciousActivity {
    pub fn new(kind: ActivityKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActivityAlert {
    pub message: String,
}

/// Frames exchanged with the proctoring server: `{"event": ..., "data": ...}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChannelMessage {
    JoinExam(String),
    SuspiciousActivity(SuspiciousActivity),
    ActivityAlert(ActivityAlert),
}

#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn join_exam(&self, exam_id: &str) -> Result<()>;
    async fn report(&self, activity: SuspiciousActivity) -> Result<()>;
    /// Inbound alerts; handed out once to whoever consumes them.
    fn take_alerts(&self) -> Option<mpsc::Receiver<ActivityAlert>>;
    async fn close(&self);
}

/// Real-time channel over a websocket, owned by one exam session.
pub struct SocketAlertChannel {
    outgoing: mpsc::Sender<Message>,
    alerts: Mutex<Option<mpsc::Receiver<ActivityAlert>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SocketAlertChannel {
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, response) = connect_async(url).await?;
        info!("🔌 Alert socket connected: {}", response.status());
        let (mut write, mut read) = socket.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(100);
        let (alert_tx, alert_rx) = mpsc::channel::<ActivityAlert>(100);

        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = write.send(message).await {
                    error!("Failed to send on alert socket: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ChannelMessage>(&text) {
                        Ok(ChannelMessage::ActivityAlert(alert)) => {
                            if alert_tx.send(alert).await.is_err() {
                                break;
                            }
                        }
                        Ok(other) => debug!("Ignoring socket event: {:?}", other),
                        Err(e) => debug!("Unrecognized socket message {}: {}", text, e),
                    },
                    Ok(Message::Close(close)) => {
                        if let Some(reason) = close {
                            info!("Socket closed with reason: {}", reason);
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            outgoing: outgoing_tx,
            alerts: Mutex::new(Some(alert_rx)),
            reader: Mutex::new(Some(reader)),
        })
    }

    async fn send(&self, message: &ChannelMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.outgoing
            .send(Message::Text(text))
            .await
            .map_err(|_| anyhow::anyhow!("Alert socket is closed"))
    }
}

#[async_trait]
impl AlertChannel for SocketAlertChannel {
    async fn join_exam(&self, exam_id: &str) -> Result<()> {
        info!("📡 Joining exam room: {}", exam_id);
        self.send(&ChannelMessage::JoinExam(exam_id.to_string())).await
    }

    async fn report(&self, activity: SuspiciousActivity) -> Result<()> {
        self.send(&ChannelMessage::SuspiciousActivity(activity)).await
    }

    fn take_alerts(&self) -> Option<mpsc::Receiver<ActivityAlert>> {
        self.alerts.lock().take()
    }

    async fn close(&self) {
        if self.outgoing.send(Message::Close(None)).await.is_err() {
            debug!("Alert socket writer already gone");
        }
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        info!("🔌 Alert socket closed");
    }
}

/// Used when no socket URL is configured; every event is only logged.
#[derive(Debug, Default)]
pub struct OfflineAlertChannel;

#[async_trait]
impl AlertChannel for OfflineAlertChannel {
    async fn join_exam(&self, exam_id: &str) -> Result<()> {
        warn!("Offline: not announcing exam {}", exam_id);
        Ok(())
    }

    async fn report(&self, activity: SuspiciousActivity) -> Result<()> {
        info!("Offline suspicious activity {:?}: {}", activity.kind, activity.message);
        Ok(())
    }

    fn take_alerts(&self) -> Option<mpsc::Receiver<ActivityAlert>> {
        None
    }

    async fn close(&self) {}
}
