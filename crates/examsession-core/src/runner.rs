//! Async driver for an exam session.
//!
//! `SessionRunner` owns the state machine and the two collaborators and
//! drives every async phase to settlement. The countdown runs as a
//! periodic task inside [`run_answering`](SessionRunner::run_answering);
//! the interval is dropped the moment the session leaves Answering, before
//! the scorer is awaited, so no stale tick can fire after the transition.
//! All entry points take `&mut self`, which rules out a second in-flight
//! request for the same phase.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::{Result, SessionError};
use crate::events::SessionEvent;
use crate::provider::{ScoreRequest, Scorer, TestProvider};
use crate::session::{ExamSession, SessionState, Submission};

/// Commands accepted while the countdown is running. `Submit` must only be
/// sent after the caller has obtained user confirmation; countdown expiry
/// submits without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCommand {
    Select { question_id: String, answer: String },
    GoTo(usize),
    Next,
    Previous,
    Submit,
}

pub struct SessionRunner {
    session: ExamSession,
    provider: Box<dyn TestProvider>,
    scorer: Box<dyn Scorer>,
    tick_period: Duration,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl SessionRunner {
    pub fn new(provider: Box<dyn TestProvider>, scorer: Box<dyn Scorer>) -> Self {
        Self {
            session: ExamSession::new(),
            provider,
            scorer,
            tick_period: Duration::from_secs(1),
            events: None,
        }
    }

    /// Override the one-second tick period. Tests run on millisecond ticks.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Attach an event sink. Send failures are ignored; a dropped receiver
    /// must not stall the session.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    /// Access for configuring-phase operations.
    pub fn session_mut(&mut self) -> &mut ExamSession {
        &mut self.session
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Configuring -> Generating -> Answering (or Failed). Holds `&mut
    /// self` until the provider settles, so a second generation cannot be
    /// started while one is in flight.
    pub async fn generate(&mut self) -> Result<SessionEvent> {
        let request = self.session.begin_generation()?;
        self.emit(SessionEvent::GenerationStarted {
            paper_id: request.paper_type.clone(),
            question_count: request.num_questions,
            at: Utc::now(),
        });
        let outcome = self.provider.generate(&request).await;
        let event = self.session.complete_generation(outcome)?;
        self.emit(event.clone());
        Ok(event)
    }

    /// Drive the answering phase to its end: tick the countdown, apply
    /// commands, and score the single resulting submission. Returns the
    /// terminal event (`SessionCompleted` or `SubmissionFailed`).
    ///
    /// A closed command channel submits whatever has been answered.
    pub async fn run_answering(
        &mut self,
        commands: &mut mpsc::Receiver<AnswerCommand>,
    ) -> Result<SessionEvent> {
        if !matches!(self.session.state(), SessionState::Answering { .. }) {
            return Err(SessionError::WrongState {
                state: self.session.state().name(),
            });
        }
        let submission = match self.countdown(commands).await {
            Some(submission) => submission,
            None => {
                return Err(SessionError::WrongState {
                    state: self.session.state().name(),
                })
            }
        };
        self.score(submission).await
    }

    /// The countdown loop. The interval lives only inside this function;
    /// returning drops it, which cancels the periodic task before any
    /// scoring starts.
    async fn countdown(
        &mut self,
        commands: &mut mpsc::Receiver<AnswerCommand>,
    ) -> Option<Submission> {
        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick resolves immediately; consume it so the
        // first decrement lands one full period in.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(submission) = self.session.tick() {
                        return Some(submission);
                    }
                    if let Some(remaining) = self.session.remaining_secs() {
                        self.emit(SessionEvent::CountdownTick {
                            remaining_secs: remaining,
                            at: Utc::now(),
                        });
                    }
                }
                command = commands.recv() => match command {
                    None | Some(AnswerCommand::Submit) => {
                        return self.session.request_submit();
                    }
                    Some(AnswerCommand::Select { question_id, answer }) => {
                        match self.session.select_answer(&question_id, &answer) {
                            Ok(()) => self.emit(SessionEvent::AnswerRecorded {
                                question_id,
                                answer,
                                at: Utc::now(),
                            }),
                            Err(error) => self.emit(SessionEvent::AnswerRejected {
                                message: error.to_string(),
                                at: Utc::now(),
                            }),
                        }
                    }
                    Some(AnswerCommand::GoTo(index)) => {
                        self.session.go_to(index);
                        self.emit_navigated();
                    }
                    Some(AnswerCommand::Next) => {
                        self.session.next();
                        self.emit_navigated();
                    }
                    Some(AnswerCommand::Previous) => {
                        self.session.previous();
                        self.emit_navigated();
                    }
                },
            }
        }
    }

    fn emit_navigated(&self) {
        if let Some(current_index) = self.session.current_index() {
            self.emit(SessionEvent::Navigated {
                current_index,
                at: Utc::now(),
            });
        }
    }

    /// Invoke the scorer for a submission and settle the outcome. The
    /// scorer runs at most once per transition into Submitting.
    async fn score(&mut self, submission: Submission) -> Result<SessionEvent> {
        self.emit(SessionEvent::SubmissionStarted {
            test_id: submission.test_id.clone(),
            forced: submission.forced,
            answered: submission.answers.len(),
            at: Utc::now(),
        });
        let request = ScoreRequest {
            test_id: submission.test_id,
            answers: submission.answers,
        };
        let outcome = self.scorer.score(&request).await;
        let event = self.session.complete_submission(outcome)?;
        self.emit(event.clone());
        Ok(event)
    }

    /// Re-attempt scoring after a submission failure, with the preserved
    /// answer sheet.
    pub async fn retry_submit(&mut self) -> Result<SessionEvent> {
        let submission = self.session.retry_submit()?;
        self.score(submission).await
    }
}
