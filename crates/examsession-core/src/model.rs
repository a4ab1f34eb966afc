//! Test, question, answer-sheet, and score types shared with the
//! collaborator wire contract.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GenerationError;

/// One question of a generated test.
///
/// Descriptive (mains-style) questions carry no options; the backend sends
/// `options: null` for those, which deserializes to an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default, deserialize_with = "nullable_options")]
    pub options: Vec<String>,
}

fn nullable_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let options = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(options.unwrap_or_default())
}

impl Question {
    /// MCQ questions offer options; descriptive ones accept free text.
    pub fn is_multiple_choice(&self) -> bool {
        !self.options.is_empty()
    }

    pub fn offers_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// A generated test. Immutable once received; owned exclusively by the
/// active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockTest {
    pub test_id: String,
    pub questions: Vec<Question>,
    pub duration_secs: u64,
}

impl MockTest {
    /// Receipt validation: never start a session on a test with no
    /// questions, a zero duration, repeated question ids, or a question
    /// repeating an option.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.questions.is_empty() {
            return Err(GenerationError::EmptyTest);
        }
        if self.duration_secs == 0 {
            return Err(GenerationError::NonPositiveDuration);
        }
        let mut ids = BTreeSet::new();
        for question in &self.questions {
            if !ids.insert(question.id.as_str()) {
                return Err(GenerationError::DuplicateQuestionId(question.id.clone()));
            }
            let mut options = BTreeSet::new();
            for option in &question.options {
                if !options.insert(option.as_str()) {
                    return Err(GenerationError::DuplicateOption {
                        question_id: question.id.clone(),
                        option: option.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Answers recorded so far: question id -> selected option (or free text
/// for descriptive questions). Ordered so submission payloads are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(BTreeMap<String, String>);

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, overwriting any previous one for the same id.
    pub fn record(&mut self, question_id: &str, answer: &str) {
        self.0.insert(question_id.to_string(), answer.to_string());
    }

    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Final score for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub score: u32,
    pub total: u32,
}

/// Render remaining time as zero-padded `MM:SS`.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
