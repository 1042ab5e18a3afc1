use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::SessionEvent;

pub const AI_CONTENT_WARNING: &str = "AI-generated content detected";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismReport {
    pub is_plagiarized: bool,
    /// 0.0 ..= 1.0
    pub similarity: f64,
}

impl PlagiarismReport {
    pub fn similarity_percent(&self) -> u32 {
        (self.similarity.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    pub fn warning(&self) -> String {
        format!(
            "Potential plagiarism detected ({}% similarity)",
            self.similarity_percent()
        )
    }
}

#[async_trait]
pub trait ContentDetector: Send + Sync {
    async fn detect_ai(&self, text: &str) -> Result<bool>;
    async fn check_plagiarism(&self, text: &str) -> Result<PlagiarismReport>;
}

/// Result of one analysis cycle. A failed check reports nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub question_id: String,
    pub ai_generated: bool,
    pub plagiarism: Option<PlagiarismReport>,
}

impl AnalysisOutcome {
    pub fn plagiarism_flagged(&self) -> Option<&PlagiarismReport> {
        self.plagiarism.as_ref().filter(|report| report.is_plagiarized)
    }
}

pub fn should_analyze(text: &str, min_chars: usize) -> bool {
    text.chars().count() > min_chars
}

/// Runs both checks concurrently and posts the outcome back to the session queue.
pub fn spawn_analysis(
    detector: Arc<dyn ContentDetector>,
    question_id: String,
    text: String,
    events: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (ai, plagiarism) = tokio::join!(
            detector.detect_ai(&text),
            detector.check_plagiarism(&text)
        );

        let ai_generated = match ai {
            Ok(flag) => flag,
            Err(e) => {
                error!("AI detection failed for question {}: {}", question_id, e);
                false
            }
        };
        let plagiarism = match plagiarism {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Plagiarism check failed for question {}: {}", question_id, e);
                None
            }
        };

        let outcome = AnalysisOutcome {
            question_id,
            ai_generated,
            plagiarism,
        };
        if events.send(SessionEvent::Analysis(outcome)).await.is_err() {
            debug!("Session queue closed before analysis finished");
        }
    })
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiDetectionResponse {
    is_ai_generated: bool,
}

/// AI-content and plagiarism checks served by one HTTP service.
#[derive(Clone)]
pub struct HttpContentDetector {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl HttpContentDetector {
    pub fn new(base_url: String, api_key: Option<String>, timeout: std::time::Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, text: &str) -> Result<T> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .json(&TextRequest { text });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Content detection API error on /{}: {}", path, error_text);
            return Err(anyhow::anyhow!("Content detection API error: {}", error_text));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContentDetector for HttpContentDetector {
    async fn detect_ai(&self, text: &str) -> Result<bool> {
        let response: AiDetectionResponse = self.post("ai-detection", text).await?;
        Ok(response.is_ai_generated)
    }

    async fn check_plagiarism(&self, text: &str) -> Result<PlagiarismReport> {
        let report: PlagiarismReport = self.post("plagiarism", text).await?;
        info!("Plagiarism similarity: {}%", report.similarity_percent());
        Ok(report)
    }
}

/// Stand-in when no content service is configured: never flags anything.
#[derive(Debug, Clone, Default)]
pub struct DisabledContentDetector;

#[async_trait]
impl ContentDetector for DisabledContentDetector {
    async fn detect_ai(&self, _text: &str) -> Result<bool> {
        Ok(false)
    }

    async fn check_plagiarism(&self, _text: &str) -> Result<PlagiarismReport> {
        Ok(PlagiarismReport {
            is_plagiarized: false,
            similarity: 0.0,
        })
    }
}

pub fn content_detector_from(
    url: Option<&str>,
    api_key: Option<String>,
    timeout: std::time::Duration,
) -> Arc<dyn ContentDetector> {
    match url {
        Some(url) => Arc::new(HttpContentDetector::new(url.to_string(), api_key, timeout)),
        None => {
            warn!("Content detection service not configured - AI features will be limited");
            Arc::new(DisabledContentDetector)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strictly_greater() {
        assert!(!should_analyze(&"x".repeat(30), 30));
        assert!(should_analyze(&"x".repeat(31), 30));
        // multi-byte characters count once
        assert!(!should_analyze(&"é".repeat(30), 30));
    }

    #[test]
    fn test_plagiarism_warning_rounds_percentage() {
        let report = PlagiarismReport {
            is_plagiarized: true,
            similarity: 0.876,
        };
        assert_eq!(report.similarity_percent(), 88);
        assert_eq!(report.warning(), "Potential plagiarism detected (88% similarity)");
    }

    #[test]
    fn test_only_positive_plagiarism_is_flagged() {
        let mut outcome = AnalysisOutcome {
            question_id: "1".to_string(),
            ai_generated: false,
            plagiarism: Some(PlagiarismReport {
                is_plagiarized: false,
                similarity: 0.4,
            }),
        };
        assert!(outcome.plagiarism_flagged().is_none());
        outcome.plagiarism = Some(PlagiarismReport {
            is_plagiarized: true,
            similarity: 0.9,
        });
        assert!(outcome.plagiarism_flagged().is_some());
    }

    #[tokio::test]
    async fn test_disabled_detector_reports_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        spawn_analysis(
            Arc::new(DisabledContentDetector),
            "q1".to_string(),
            "a".repeat(40),
            tx,
        )
        .await
        .unwrap();

        match rx.recv().await {
            Some(SessionEvent::Analysis(outcome)) => {
                assert_eq!(outcome.question_id, "q1");
                assert!(!outcome.ai_generated);
                assert!(outcome.plagiarism_flagged().is_none());
            }
            _ => panic!("expected analysis outcome"),
        }
    }
}
