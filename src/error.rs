use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExamError {
    #[error("Camera access denied: {0}")]
    CameraAccessDenied(String),
    #[error("Unanswered questions: {}", .flagged.join(", "))]
    IncompleteAnswers { flagged: Vec<String> },
    #[error("Exam already submitted")]
    AlreadyCompleted,
    #[error("Exam session is closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, ExamError>;
