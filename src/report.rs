use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exam::{Question, SessionCounters};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// `count > high_above` → high, `count > medium_above` → medium, else low.
    pub fn bucket(count: u32, medium_above: u32, high_above: u32) -> Self {
        if count > high_above {
            Severity::High
        } else if count > medium_above {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
    pub severity: Severity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

pub const TAB_SWITCHING: &str = "Tab Switching";
pub const OUT_OF_FRAME: &str = "Out of Frame";
pub const PHONE_USAGE: &str = "Phone Usage";
pub const AI_CONTENT: &str = "AI-Generated Content";

/// The fixed anomaly list computed at submission.
pub fn build_anomalies(
    counters: &SessionCounters,
    ai_detected: bool,
    timestamp: DateTime<Utc>,
) -> Vec<Anomaly> {
    let ai_count = u32::from(ai_detected);
    vec![
        Anomaly {
            kind: TAB_SWITCHING.to_string(),
            count: counters.tab_switches,
            severity: Severity::bucket(counters.tab_switches, 2, 5),
            description: format!("Left the exam tab {} time(s)", counters.tab_switches),
            timestamp,
        },
        Anomaly {
            kind: OUT_OF_FRAME.to_string(),
            count: counters.out_of_frame,
            severity: Severity::bucket(counters.out_of_frame, 5, 10),
            description: format!("Face left the camera frame {} time(s)", counters.out_of_frame),
            timestamp,
        },
        Anomaly {
            kind: PHONE_USAGE.to_string(),
            count: counters.phone_usage,
            severity: Severity::bucket(counters.phone_usage, 1, 3),
            description: format!("Phone seen on camera in {} check(s)", counters.phone_usage),
            timestamp,
        },
        Anomaly {
            kind: AI_CONTENT.to_string(),
            count: ai_count,
            severity: Severity::bucket(ai_count, u32::MAX, 0),
            description: if ai_detected {
                "Answers flagged as AI-generated".to_string()
            } else {
                "No AI-generated content flagged".to_string()
            },
            timestamp,
        },
    ]
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub answer: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: String,
    pub exam_id: String,
    pub timestamp: DateTime<Utc>,
    pub anomalies: Vec<Anomaly>,
    pub warnings: Vec<String>,
    pub counters: SessionCounters,
    pub ai_detected: bool,
    pub answers: Vec<AnswerRecord>,
    pub time_taken_secs: u64,
}

impl ExamResult {
    pub fn is_high_risk(&self) -> bool {
        self.counters.tab_switches > 0 || self.ai_detected
    }

    pub fn anomaly(&self, kind: &str) -> Option<&Anomaly> {
        self.anomalies.iter().find(|a| a.kind == kind)
    }
}

pub struct ResultInput<'a> {
    pub exam_id: &'a str,
    pub questions: &'a [Question],
    pub warnings: &'a [String],
    pub counters: SessionCounters,
    pub ai_detected: bool,
    pub time_taken_secs: u64,
}

pub fn build_result(input: ResultInput<'_>) -> ExamResult {
    let timestamp = Utc::now();
    ExamResult {
        id: Uuid::new_v4().to_string(),
        exam_id: input.exam_id.to_string(),
        timestamp,
        anomalies: build_anomalies(&input.counters, input.ai_detected, timestamp),
        warnings: input.warnings.to_vec(),
        counters: input.counters,
        ai_detected: input.ai_detected,
        answers: input
            .questions
            .iter()
            .map(|q| AnswerRecord {
                question_id: q.id.clone(),
                answer: q.answer.clone(),
            })
            .collect(),
        time_taken_secs: input.time_taken_secs,
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub exam_id: String,
    pub timestamp: DateTime<Utc>,
}

impl RecentActivity {
    pub fn high_risk(result: &ExamResult) -> Self {
        let mut reasons = Vec::new();
        if result.counters.tab_switches > 0 {
            reasons.push(format!("{} tab switch(es)", result.counters.tab_switches));
        }
        if result.ai_detected {
            reasons.push("AI-generated content".to_string());
        }

        Self {
            id: Uuid::new_v4().to_string(),
            kind: "high-risk".to_string(),
            title: "High Risk Activity Detected".to_string(),
            description: reasons.join(", "),
            exam_id: result.exam_id.clone(),
            timestamp: result.timestamp,
        }
    }
}
