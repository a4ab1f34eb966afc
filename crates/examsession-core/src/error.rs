//! Error types for examsession-core.
//!
//! One top-level [`SessionError`] with focused sub-enums per failure
//! domain, all built on thiserror.

use thiserror::Error;

use crate::config::ExamCategory;

/// Top-level error type for the session engine.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Configuration rejected before generation started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Answer rejected while answering.
    #[error("invalid answer: {0}")]
    InvalidAnswer(#[from] AnswerError),

    /// Test generation failed; the session holds no test to preserve.
    #[error("test generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Scoring failed; the test and answer sheet are preserved for retry.
    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),

    /// An operation was issued in a state that does not accept it.
    #[error("operation not allowed while {state}")]
    WrongState { state: &'static str },
}

/// Draft-configuration errors. Rejected synchronously, no state change.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("paper '{paper}' is not offered for {category}")]
    UnknownPaper {
        paper: String,
        category: ExamCategory,
    },

    #[error("question count {count} outside allowed range {min}..={max}")]
    CountOutOfRange { count: u32, min: u32, max: u32 },
}

/// Answer-recording errors. Rejected synchronously, no state change.
#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("question '{question_id}' is not part of the current test")]
    UnknownQuestion { question_id: String },

    #[error("option '{option}' is not offered by question '{question_id}'")]
    OptionNotOffered { question_id: String, option: String },
}

/// Test-generation errors, including rejection of malformed provider
/// responses.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("provider returned a test with no questions")]
    EmptyTest,

    #[error("provider returned a non-positive duration")]
    NonPositiveDuration,

    #[error("provider returned duplicate question id '{0}'")]
    DuplicateQuestionId(String),

    #[error("question '{question_id}' repeats option '{option}'")]
    DuplicateOption { question_id: String, option: String },

    #[error("{0}")]
    Other(String),
}

/// Scoring errors.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scorer returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for SessionError.
pub type Result<T, E = SessionError> = std::result::Result<T, E>;
