//! # Examsession Core Library
//!
//! Core engine for timed mock-test sessions. One [`ExamSession`] per
//! attempt drives the whole flow: configure, generate, answer against a
//! countdown, submit, score.
//!
//! ## Architecture
//!
//! - **State machine**: [`ExamSession`] is caller-driven and does no I/O;
//!   the caller ticks the countdown and feeds collaborator outcomes back in
//! - **Runner**: [`SessionRunner`] owns the session plus the collaborators
//!   and runs the countdown as a cancellable periodic task
//! - **Collaborators**: [`TestProvider`] and [`Scorer`] traits, with HTTP
//!   implementations speaking the backend's mock-test API
//! - **Events**: every observable change produces a [`SessionEvent`] for
//!   the UI layer

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod model;
pub mod provider;
pub mod runner;
pub mod session;

pub use config::{papers_for, Difficulty, ExamCategory, PaperInfo, QuestionSource, TestConfig};
pub use error::{
    AnswerError, ConfigError, GenerationError, Result, SessionError, SubmissionError,
};
pub use events::SessionEvent;
pub use http::{HttpScorer, HttpTestProvider};
pub use model::{format_mm_ss, AnswerSheet, MockTest, Question, ScoreReport};
pub use provider::{GenerationRequest, ScoreRequest, Scorer, TestProvider};
pub use runner::{AnswerCommand, SessionRunner};
pub use session::{ExamSession, Failure, SessionState, Submission};
