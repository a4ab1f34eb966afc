//! The exam session state machine.
//!
//! The machine is caller-driven: it holds no timer of its own and performs
//! no I/O. The caller ticks it once per second while answering and feeds
//! provider/scorer outcomes back in; `SessionRunner` does both.
//!
//! ## State transitions
//!
//! ```text
//! Configuring -> Generating -> Answering -> Submitting -> Completed
//!                    |              |            |
//!                    v              +-- expiry --+
//!                 Failed(generation)             v
//!                                         Failed(submission) -> Submitting
//! ```
//!
//! `reset()` returns to Configuring with a default draft from any state.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{Difficulty, ExamCategory, QuestionSource, TestConfig};
use crate::error::{AnswerError, GenerationError, Result, SessionError, SubmissionError};
use crate::events::SessionEvent;
use crate::model::{AnswerSheet, MockTest, Question, ScoreReport};
use crate::provider::GenerationRequest;

/// Why a session is in the Failed state. A submission failure keeps the
/// test and answer sheet so scoring can be retried without losing answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    Generation {
        message: String,
    },
    Submission {
        message: String,
        test: MockTest,
        answers: AnswerSheet,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Configuring {
        config: TestConfig,
    },
    Generating {
        config: TestConfig,
    },
    Answering {
        test: MockTest,
        answers: AnswerSheet,
        current_index: usize,
        remaining_secs: u64,
    },
    Submitting {
        test: MockTest,
        answers: AnswerSheet,
    },
    Completed {
        report: ScoreReport,
    },
    Failed {
        failure: Failure,
    },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Configuring {
            config: TestConfig::default(),
        }
    }
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Configuring { .. } => "configuring",
            SessionState::Generating { .. } => "generating",
            SessionState::Answering { .. } => "answering",
            SessionState::Submitting { .. } => "submitting",
            SessionState::Completed { .. } => "completed",
            SessionState::Failed { .. } => "failed",
        }
    }
}

/// Snapshot handed to the scorer when the session leaves Answering.
/// `forced` is true when countdown expiry, not the user, triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub test_id: String,
    pub answers: AnswerSheet,
    pub forced: bool,
}

/// One live session per attempt, from configuration to result.
///
/// All mutation goes through `&mut self`, so transitions are serialized by
/// construction. Ticks and submit requests that arrive after the session
/// has left Answering are no-ops, which makes a forced submission and a
/// concurrently issued manual one collapse into exactly one transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamSession {
    state: SessionState,
}

impl ExamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn wrong_state(&self) -> SessionError {
        SessionError::WrongState {
            state: self.state.name(),
        }
    }

    // ── Configuring ──────────────────────────────────────────────────

    fn config_mut(&mut self) -> Result<&mut TestConfig> {
        let state = self.state.name();
        match &mut self.state {
            SessionState::Configuring { config } => Ok(config),
            _ => Err(SessionError::WrongState { state }),
        }
    }

    pub fn config(&self) -> Option<&TestConfig> {
        match &self.state {
            SessionState::Configuring { config } | SessionState::Generating { config } => {
                Some(config)
            }
            _ => None,
        }
    }

    pub fn set_exam_category(&mut self, category: ExamCategory) -> Result<()> {
        self.config_mut()?.set_exam_category(category);
        Ok(())
    }

    pub fn set_paper(&mut self, paper_id: &str) -> Result<()> {
        self.config_mut()?.set_paper(paper_id)?;
        Ok(())
    }

    pub fn adjust_question_count(&mut self, delta: i64) -> Result<()> {
        self.config_mut()?.adjust_question_count(delta);
        Ok(())
    }

    pub fn set_question_count(&mut self, count: u32) -> Result<()> {
        self.config_mut()?.set_question_count(count)?;
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<()> {
        self.config_mut()?.set_difficulty(difficulty);
        Ok(())
    }

    pub fn set_question_source(&mut self, source: QuestionSource) -> Result<()> {
        self.config_mut()?.set_question_source(source);
        Ok(())
    }

    pub fn set_include_current_affairs(&mut self, include: bool) -> Result<()> {
        self.config_mut()?.set_include_current_affairs(include);
        Ok(())
    }

    /// Freeze the draft and move to Generating. Returns the request the
    /// caller must take to the provider; the eventual outcome comes back
    /// through [`complete_generation`](Self::complete_generation).
    pub fn begin_generation(&mut self) -> Result<GenerationRequest> {
        let config = match &self.state {
            SessionState::Configuring { config } => config,
            _ => return Err(self.wrong_state()),
        };
        config.validate()?;
        let request = GenerationRequest::from(config);
        self.state = SessionState::Generating {
            config: config.clone(),
        };
        Ok(request)
    }

    // ── Generating ───────────────────────────────────────────────────

    /// Settle the in-flight generation request.
    ///
    /// The received test is validated before the session starts answering;
    /// a malformed test is a generation failure like any other.
    pub fn complete_generation(
        &mut self,
        outcome: std::result::Result<MockTest, GenerationError>,
    ) -> Result<SessionEvent> {
        if !matches!(self.state, SessionState::Generating { .. }) {
            return Err(self.wrong_state());
        }
        let error = match outcome {
            Ok(test) => match test.validate() {
                Ok(()) => {
                    let event = SessionEvent::TestReady {
                        test_id: test.test_id.clone(),
                        question_count: test.len(),
                        duration_secs: test.duration_secs,
                        at: Utc::now(),
                    };
                    self.state = SessionState::Answering {
                        remaining_secs: test.duration_secs,
                        test,
                        answers: AnswerSheet::new(),
                        current_index: 0,
                    };
                    return Ok(event);
                }
                Err(e) => e,
            },
            Err(e) => e,
        };
        let message = error.to_string();
        self.state = SessionState::Failed {
            failure: Failure::Generation {
                message: message.clone(),
            },
        };
        Ok(SessionEvent::GenerationFailed {
            message,
            at: Utc::now(),
        })
    }

    // ── Answering ────────────────────────────────────────────────────

    pub fn test(&self) -> Option<&MockTest> {
        match &self.state {
            SessionState::Answering { test, .. } | SessionState::Submitting { test, .. } => {
                Some(test)
            }
            SessionState::Failed {
                failure: Failure::Submission { test, .. },
            } => Some(test),
            _ => None,
        }
    }

    pub fn answers(&self) -> Option<&AnswerSheet> {
        match &self.state {
            SessionState::Answering { answers, .. }
            | SessionState::Submitting { answers, .. } => Some(answers),
            SessionState::Failed {
                failure: Failure::Submission { answers, .. },
            } => Some(answers),
            _ => None,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        match &self.state {
            SessionState::Answering { current_index, .. } => Some(*current_index),
            _ => None,
        }
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        match &self.state {
            SessionState::Answering { remaining_secs, .. } => Some(*remaining_secs),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &self.state {
            SessionState::Answering {
                test,
                current_index,
                ..
            } => test.questions.get(*current_index),
            _ => None,
        }
    }

    /// Record or overwrite the answer for a question of the current test.
    ///
    /// For multiple-choice questions the answer must be one of the
    /// question's options; descriptive questions accept any text.
    pub fn select_answer(&mut self, question_id: &str, answer: &str) -> Result<()> {
        let (test, answers) = match &mut self.state {
            SessionState::Answering { test, answers, .. } => (test, answers),
            _ => {
                return Err(SessionError::WrongState {
                    state: self.state.name(),
                })
            }
        };
        let question = test
            .question(question_id)
            .ok_or_else(|| AnswerError::UnknownQuestion {
                question_id: question_id.to_string(),
            })?;
        if question.is_multiple_choice() && !question.offers_option(answer) {
            return Err(AnswerError::OptionNotOffered {
                question_id: question_id.to_string(),
                option: answer.to_string(),
            }
            .into());
        }
        answers.record(question_id, answer);
        Ok(())
    }

    /// Jump to a question. Out-of-range indices and calls outside
    /// Answering are no-ops.
    pub fn go_to(&mut self, index: usize) {
        if let SessionState::Answering {
            test,
            current_index,
            ..
        } = &mut self.state
        {
            if index < test.len() {
                *current_index = index;
            }
        }
    }

    /// Advance one question, clamping at the last index. No wrap.
    pub fn next(&mut self) {
        if let SessionState::Answering {
            test,
            current_index,
            ..
        } = &mut self.state
        {
            if *current_index + 1 < test.len() {
                *current_index += 1;
            }
        }
    }

    /// Step back one question, clamping at index 0. No wrap.
    pub fn previous(&mut self) {
        if let SessionState::Answering { current_index, .. } = &mut self.state {
            *current_index = current_index.saturating_sub(1);
        }
    }

    /// One countdown tick. Decrements the remaining time; on reaching zero
    /// the session moves to Submitting and the forced submission is
    /// returned. Ticks outside Answering are stale and ignored.
    pub fn tick(&mut self) -> Option<Submission> {
        if let SessionState::Answering { remaining_secs, .. } = &mut self.state {
            *remaining_secs = remaining_secs.saturating_sub(1);
            if *remaining_secs == 0 {
                return self.take_submission(true);
            }
        }
        None
    }

    /// Manual submission. The caller must have obtained user confirmation
    /// before calling. Returns `None` when the session has already left
    /// Answering, so racing a forced submission is harmless.
    pub fn request_submit(&mut self) -> Option<Submission> {
        self.take_submission(false)
    }

    fn take_submission(&mut self, forced: bool) -> Option<Submission> {
        match std::mem::take(&mut self.state) {
            SessionState::Answering { test, answers, .. } => {
                let submission = Submission {
                    test_id: test.test_id.clone(),
                    answers: answers.clone(),
                    forced,
                };
                self.state = SessionState::Submitting { test, answers };
                Some(submission)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    // ── Submitting ───────────────────────────────────────────────────

    /// Settle the in-flight scoring request. On failure the test and
    /// answer sheet are kept so [`retry_submit`](Self::retry_submit) can
    /// re-attempt scoring with the identical sheet.
    pub fn complete_submission(
        &mut self,
        outcome: std::result::Result<ScoreReport, SubmissionError>,
    ) -> Result<SessionEvent> {
        let (test, answers) = match std::mem::take(&mut self.state) {
            SessionState::Submitting { test, answers } => (test, answers),
            other => {
                self.state = other;
                return Err(self.wrong_state());
            }
        };
        match outcome {
            Ok(report) => {
                self.state = SessionState::Completed { report };
                Ok(SessionEvent::SessionCompleted {
                    score: report.score,
                    total: report.total,
                    at: Utc::now(),
                })
            }
            Err(error) => {
                let message = error.to_string();
                self.state = SessionState::Failed {
                    failure: Failure::Submission {
                        message: message.clone(),
                        test,
                        answers,
                    },
                };
                Ok(SessionEvent::SubmissionFailed {
                    message,
                    at: Utc::now(),
                })
            }
        }
    }

    /// Re-enter Submitting after a submission failure, with the preserved
    /// test and answers. Only valid from `Failed(Submission)`.
    pub fn retry_submit(&mut self) -> Result<Submission> {
        match std::mem::take(&mut self.state) {
            SessionState::Failed {
                failure: Failure::Submission { test, answers, .. },
            } => {
                let submission = Submission {
                    test_id: test.test_id.clone(),
                    answers: answers.clone(),
                    forced: false,
                };
                self.state = SessionState::Submitting { test, answers };
                Ok(submission)
            }
            other => {
                self.state = other;
                Err(self.wrong_state())
            }
        }
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        match &self.state {
            SessionState::Completed { report } => Some(report),
            _ => None,
        }
    }

    /// Back to Configuring with a default draft, from any state.
    pub fn reset(&mut self) -> SessionEvent {
        self.state = SessionState::default();
        SessionEvent::SessionReset { at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mcq(id: &str) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("prompt {id}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        }
    }

    fn ten_question_test() -> MockTest {
        MockTest {
            test_id: "test_1234".into(),
            questions: (1..=10).map(|n| mcq(&format!("q{n}"))).collect(),
            duration_secs: 600,
        }
    }

    fn answering_session(test: MockTest) -> ExamSession {
        let mut session = ExamSession::new();
        session.begin_generation().unwrap();
        session.complete_generation(Ok(test)).unwrap();
        session
    }

    #[test]
    fn generate_starts_answering_at_full_duration() {
        // Scenario A: default prelims/gs1/10/medium draft.
        let mut session = ExamSession::new();
        let request = session.begin_generation().unwrap();
        assert_eq!(request.paper_type, "gs1");
        assert_eq!(request.num_questions, 10);
        assert_eq!(session.state().name(), "generating");

        let event = session.complete_generation(Ok(ten_question_test())).unwrap();
        assert!(matches!(
            event,
            SessionEvent::TestReady {
                question_count: 10,
                duration_secs: 600,
                ..
            }
        ));
        assert_eq!(session.remaining_secs(), Some(600));
        assert_eq!(session.current_index(), Some(0));
        assert!(session.answers().unwrap().is_empty());
    }

    #[test]
    fn config_frozen_once_generating() {
        let mut session = ExamSession::new();
        session.begin_generation().unwrap();
        assert!(matches!(
            session.set_difficulty(Difficulty::Hard),
            Err(SessionError::WrongState { state: "generating" })
        ));
        assert!(session.begin_generation().is_err());
    }

    #[test]
    fn invalid_paper_rejected_without_state_change() {
        // Scenario D.
        let mut session = ExamSession::new();
        let before = session.config().unwrap().clone();
        let err = session.set_paper("gs9").unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig(_)));
        assert_eq!(session.config().unwrap(), &before);
        assert_eq!(session.state().name(), "configuring");
    }

    #[test]
    fn generation_failure_is_resettable() {
        let mut session = ExamSession::new();
        session.begin_generation().unwrap();
        let event = session
            .complete_generation(Err(GenerationError::Other("backend down".into())))
            .unwrap();
        assert!(matches!(event, SessionEvent::GenerationFailed { .. }));
        assert_eq!(session.state().name(), "failed");
        assert!(session.test().is_none());

        session.reset();
        assert_eq!(session.state().name(), "configuring");
        assert!(session.begin_generation().is_ok());
    }

    #[test]
    fn malformed_test_fails_generation() {
        let mut session = ExamSession::new();
        session.begin_generation().unwrap();
        let empty = MockTest {
            test_id: "t".into(),
            questions: vec![],
            duration_secs: 600,
        };
        session.complete_generation(Ok(empty)).unwrap();
        assert_eq!(session.state().name(), "failed");

        let mut session = ExamSession::new();
        session.begin_generation().unwrap();
        let mut zero = ten_question_test();
        zero.duration_secs = 0;
        session.complete_generation(Ok(zero)).unwrap();
        assert_eq!(session.state().name(), "failed");
    }

    #[test]
    fn navigation_clamps_without_wrapping() {
        // Scenario B: three questions, next() three times stays at 2.
        let mut test = ten_question_test();
        test.questions.truncate(3);
        let mut session = answering_session(test);

        session.next();
        session.next();
        session.next();
        assert_eq!(session.current_index(), Some(2));

        session.previous();
        session.previous();
        session.previous();
        assert_eq!(session.current_index(), Some(0));

        session.go_to(2);
        assert_eq!(session.current_index(), Some(2));
        session.go_to(3);
        assert_eq!(session.current_index(), Some(2));
        session.go_to(usize::MAX);
        assert_eq!(session.current_index(), Some(2));
    }

    #[test]
    fn select_answer_overwrites() {
        let mut session = answering_session(ten_question_test());
        session.select_answer("q1", "A").unwrap();
        session.select_answer("q1", "C").unwrap();
        let answers = session.answers().unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.answer("q1"), Some("C"));
    }

    #[test]
    fn select_answer_validates_question_and_option() {
        let mut session = answering_session(ten_question_test());
        assert!(matches!(
            session.select_answer("nope", "A"),
            Err(SessionError::InvalidAnswer(AnswerError::UnknownQuestion { .. }))
        ));
        assert!(matches!(
            session.select_answer("q1", "E"),
            Err(SessionError::InvalidAnswer(AnswerError::OptionNotOffered { .. }))
        ));
        assert!(session.answers().unwrap().is_empty());
    }

    #[test]
    fn descriptive_question_accepts_free_text() {
        let mut test = ten_question_test();
        test.questions.push(Question {
            id: "q11".into(),
            prompt: "Discuss.".into(),
            options: vec![],
        });
        let mut session = answering_session(test);
        session.select_answer("q11", "Any prose answer.").unwrap();
        assert_eq!(
            session.answers().unwrap().answer("q11"),
            Some("Any prose answer.")
        );
    }

    #[test]
    fn countdown_expiry_forces_submission() {
        // Scenario C: 600 ticks drive the session into Submitting.
        let mut session = answering_session(ten_question_test());
        let mut submission = None;
        for _ in 0..600 {
            assert!(submission.is_none());
            submission = session.tick();
        }
        let submission = submission.expect("tick 600 must force-submit");
        assert!(submission.forced);
        assert_eq!(submission.test_id, "test_1234");
        assert_eq!(session.state().name(), "submitting");
    }

    #[test]
    fn remaining_secs_strictly_decreases_per_tick() {
        let mut session = answering_session(ten_question_test());
        let mut last = session.remaining_secs().unwrap();
        while session.tick().is_none() {
            let now = session.remaining_secs().unwrap();
            assert_eq!(now, last - 1);
            last = now;
        }
    }

    #[test]
    fn forced_and_manual_submit_collapse_to_one_transition() {
        // Forced first: the late manual request is a no-op.
        let mut session = answering_session(ten_question_test());
        for _ in 0..600 {
            session.tick();
        }
        assert_eq!(session.state().name(), "submitting");
        assert!(session.request_submit().is_none());

        // Manual first: stale ticks are ignored.
        let mut session = answering_session(ten_question_test());
        let submission = session.request_submit().expect("first submit wins");
        assert!(!submission.forced);
        assert!(session.tick().is_none());
        assert!(session.request_submit().is_none());
        assert_eq!(session.state().name(), "submitting");
    }

    #[test]
    fn submission_payload_only_contains_test_ids() {
        let mut session = answering_session(ten_question_test());
        session.select_answer("q3", "B").unwrap();
        session.select_answer("q7", "D").unwrap();
        let submission = session.request_submit().unwrap();
        assert_eq!(submission.answers.len(), 2);
        for (id, _) in submission.answers.iter() {
            assert!(session.test().unwrap().question(id).is_some());
        }
    }

    #[test]
    fn submission_failure_preserves_sheet_for_retry() {
        // Scenario E.
        let mut session = answering_session(ten_question_test());
        session.select_answer("q1", "A").unwrap();
        session.select_answer("q2", "B").unwrap();
        let first = session.request_submit().unwrap();

        let event = session
            .complete_submission(Err(SubmissionError::Other("scorer down".into())))
            .unwrap();
        assert!(matches!(event, SessionEvent::SubmissionFailed { .. }));
        assert_eq!(session.state().name(), "failed");
        assert_eq!(session.answers().unwrap().len(), 2);
        assert!(session.test().is_some());

        let retry = session.retry_submit().unwrap();
        assert_eq!(retry.answers, first.answers);
        assert_eq!(retry.test_id, first.test_id);
        assert_eq!(session.state().name(), "submitting");

        let event = session
            .complete_submission(Ok(ScoreReport { score: 1, total: 2 }))
            .unwrap();
        assert!(matches!(
            event,
            SessionEvent::SessionCompleted { score: 1, total: 2, .. }
        ));
        assert_eq!(session.report(), Some(&ScoreReport { score: 1, total: 2 }));
    }

    #[test]
    fn retry_only_valid_after_submission_failure() {
        let mut session = ExamSession::new();
        assert!(session.retry_submit().is_err());

        session.begin_generation().unwrap();
        session
            .complete_generation(Err(GenerationError::Other("x".into())))
            .unwrap();
        // Generation failure preserves nothing; retry is not offered.
        assert!(session.retry_submit().is_err());
        assert_eq!(session.state().name(), "failed");
    }

    #[test]
    fn completed_is_terminal_until_reset() {
        let mut session = answering_session(ten_question_test());
        session.request_submit().unwrap();
        session
            .complete_submission(Ok(ScoreReport { score: 5, total: 10 }))
            .unwrap();
        assert!(session.tick().is_none());
        assert!(session.request_submit().is_none());
        assert!(session.select_answer("q1", "A").is_err());

        session.reset();
        assert_eq!(session.state().name(), "configuring");
        assert_eq!(session.config().unwrap(), &TestConfig::default());
    }

    #[derive(Debug, Clone)]
    enum Nav {
        Next,
        Previous,
        GoTo(usize),
        Tick,
    }

    fn nav_strategy() -> impl Strategy<Value = Nav> {
        prop_oneof![
            Just(Nav::Next),
            Just(Nav::Previous),
            (0usize..20).prop_map(Nav::GoTo),
            Just(Nav::Tick),
        ]
    }

    proptest! {
        #[test]
        fn current_index_always_in_bounds(
            len in 1usize..10,
            commands in proptest::collection::vec(nav_strategy(), 0..50),
        ) {
            let mut test = ten_question_test();
            test.questions.truncate(len);
            let mut session = answering_session(test);
            for command in commands {
                match command {
                    Nav::Next => session.next(),
                    Nav::Previous => session.previous(),
                    Nav::GoTo(i) => session.go_to(i),
                    Nav::Tick => {
                        session.tick();
                    }
                }
                if let Some(index) = session.current_index() {
                    prop_assert!(index < len);
                }
            }
        }

        #[test]
        fn sheet_len_never_exceeds_test_len(
            picks in proptest::collection::vec((1usize..=10, 0usize..4), 0..40),
        ) {
            let mut session = answering_session(ten_question_test());
            let options = ["A", "B", "C", "D"];
            for (q, o) in picks {
                session.select_answer(&format!("q{q}"), options[o]).unwrap();
            }
            prop_assert!(session.answers().unwrap().len() <= 10);
        }
    }
}
