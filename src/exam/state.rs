use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::Question;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounters {
    pub tab_switches: u32,
    pub out_of_frame: u32,
    pub phone_usage: u32,
}

/// Mutable state of one exam attempt: questions, navigation, warnings and counters.
#[derive(Debug, Clone)]
pub struct ExamState {
    questions: Vec<Question>,
    current: usize,
    warnings: Vec<String>,
    counters: SessionCounters,
    ai_detected: bool,
    completed: bool,
    flagged: Vec<String>,
}

impl ExamState {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            current: 0,
            warnings: Vec::new(),
            counters: SessionCounters::default(),
            ai_detected: false,
            completed: false,
            flagged: Vec::new(),
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn ai_detected(&self) -> bool {
        self.ai_detected
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn flagged(&self) -> &[String] {
        &self.flagged
    }

    pub fn answered_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_answered()).count()
    }

    /// Writes into the current question's answer. Returns the question id when written.
    pub fn set_answer(&mut self, text: &str) -> Option<String> {
        if self.completed {
            return None;
        }
        let question = self.questions.get_mut(self.current)?;
        question.answer.clear();
        question.answer.push_str(text);
        let id = question.id.clone();
        if question.is_answered() {
            self.flagged.retain(|flagged| flagged != &id);
        }
        Some(id)
    }

    pub fn go_next(&mut self) {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
    }

    pub fn go_prev(&mut self) {
        if self.current > 0 {
            self.current -= 1;
        }
    }

    pub fn select_question(&mut self, index: usize) {
        if index < self.questions.len() {
            self.current = index;
        }
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        warn!("🚩 {}", warning);
        self.warnings.push(warning);
    }

    pub fn record_tab_switch(&mut self) {
        self.counters.tab_switches += 1;
        let count = self.counters.tab_switches;
        self.push_warning(format!("Tab switch detected ({})", count));
    }

    pub fn record_out_of_frame(&mut self) {
        self.counters.out_of_frame += 1;
    }

    pub fn record_phone_usage(&mut self) {
        self.counters.phone_usage += 1;
        self.push_warning("Phone usage detected");
    }

    pub fn mark_ai_detected(&mut self) {
        self.ai_detected = true;
    }

    /// Flags every question whose trimmed answer is empty. Returns the 1-based labels.
    pub fn validate_answers(&mut self) -> Result<(), Vec<String>> {
        let unanswered: Vec<(String, String)> = self
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.is_answered())
            .map(|(i, q)| (q.id.clone(), format!("Q{}", i + 1)))
            .collect();

        if unanswered.is_empty() {
            self.flagged.clear();
            return Ok(());
        }

        let labels: Vec<String> = unanswered.iter().map(|(_, label)| label.clone()).collect();
        self.flagged = unanswered.into_iter().map(|(id, _)| id).collect();
        self.push_warning(format!(
            "Please answer all questions before submitting (unanswered: {})",
            labels.join(", ")
        ));
        Err(labels)
    }

    pub fn complete(&mut self) {
        if !self.completed {
            self.completed = true;
            info!(
                "✅ Exam completed: {}/{} answered, {} warnings",
                self.answered_count(),
                self.questions.len(),
                self.warnings.len()
            );
        }
    }
}
