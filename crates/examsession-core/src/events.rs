use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every observable state change in a session produces an event.
/// The CLI prints them; a GUI would subscribe to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    GenerationStarted {
        paper_id: String,
        question_count: u32,
        at: DateTime<Utc>,
    },
    TestReady {
        test_id: String,
        question_count: usize,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    GenerationFailed {
        message: String,
        at: DateTime<Utc>,
    },
    CountdownTick {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    AnswerRecorded {
        question_id: String,
        answer: String,
        at: DateTime<Utc>,
    },
    /// An answer command was rejected (unknown question, option outside
    /// the question's set). Not a state change; surfaced for the UI.
    AnswerRejected {
        message: String,
        at: DateTime<Utc>,
    },
    Navigated {
        current_index: usize,
        at: DateTime<Utc>,
    },
    /// The session left Answering. `forced` marks countdown expiry as the
    /// trigger rather than a user submit.
    SubmissionStarted {
        test_id: String,
        forced: bool,
        answered: usize,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        score: u32,
        total: u32,
        at: DateTime<Utc>,
    },
    SubmissionFailed {
        message: String,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
}
