//! Collaborator seams: the test provider and the scorer.
//!
//! Both are async traits so the engine can be driven against in-memory
//! fakes in tests and HTTP clients in production.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Difficulty, ExamCategory, QuestionSource, TestConfig};
use crate::error::{GenerationError, SubmissionError};
use crate::model::{AnswerSheet, MockTest, ScoreReport};

/// Generation request. Field names follow the backend wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub exam_type: ExamCategory,
    pub paper_type: String,
    pub num_questions: u32,
    pub difficulty: Difficulty,
    pub question_source: QuestionSource,
    pub include_current_affairs: bool,
}

impl From<&TestConfig> for GenerationRequest {
    fn from(config: &TestConfig) -> Self {
        Self {
            exam_type: config.exam_category,
            paper_type: config.paper_id.clone(),
            num_questions: config.question_count,
            difficulty: config.difficulty,
            question_source: config.question_source,
            include_current_affairs: config.include_current_affairs,
        }
    }
}

/// Scoring request: the test id and the full answer sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreRequest {
    pub test_id: String,
    pub answers: AnswerSheet,
}

/// Generates a test for a submitted configuration.
#[async_trait]
pub trait TestProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<MockTest, GenerationError>;
}

/// Scores a submitted answer sheet.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreReport, SubmissionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_follows_wire_contract() {
        let config = TestConfig::default();
        let request = GenerationRequest::from(&config);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["exam_type"], "prelims");
        assert_eq!(json["paper_type"], "gs1");
        assert_eq!(json["num_questions"], 10);
        assert_eq!(json["difficulty"], "medium");
        assert_eq!(json["question_source"], "mock");
        assert_eq!(json["include_current_affairs"], false);
    }
}
