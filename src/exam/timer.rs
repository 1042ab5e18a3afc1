use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub total_seconds: u64,
    pub display: String,
    pub is_running: bool,
    pub expired: bool,
}

/// Countdown for one exam attempt. Reaching zero is reported, never acted on.
#[derive(Debug, Clone)]
pub struct ExamTimer {
    total_seconds: u64,
    remaining_seconds: u64,
    is_running: bool,
}

impl ExamTimer {
    pub fn new(total_seconds: u64) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            is_running: false,
        }
    }

    pub fn start(&mut self) {
        if !self.is_running && self.remaining_seconds > 0 {
            self.is_running = true;
            info!("⏱️ Exam timer started: {}", format_time(self.remaining_seconds));
        }
    }

    pub fn stop(&mut self) -> TimerState {
        self.is_running = false;
        self.state()
    }

    /// Returns true exactly once, on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if !self.is_running || self.remaining_seconds == 0 {
            return false;
        }
        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.is_running = false;
            warn!("⏰ Exam time is up");
            return true;
        }
        false
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.total_seconds - self.remaining_seconds
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            remaining_seconds: self.remaining_seconds,
            total_seconds: self.total_seconds,
            display: format_time(self.remaining_seconds),
            is_running: self.is_running,
            expired: self.is_expired(),
        }
    }
}

/// `MM:SS`, or `H:MM:SS` from one hour upwards.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
