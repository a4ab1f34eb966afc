//! Test configuration: exam categories, the paper catalog, and the mutable
//! draft a session holds before generation starts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamCategory {
    Prelims,
    Mains,
}

impl ExamCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamCategory::Prelims => "prelims",
            ExamCategory::Mains => "mains",
        }
    }

    /// Upper bound on the number of questions a single test may request.
    pub fn max_questions(&self) -> u32 {
        match self {
            ExamCategory::Prelims => 100,
            ExamCategory::Mains => 25,
        }
    }
}

impl fmt::Display for ExamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prelims" => Ok(ExamCategory::Prelims),
            "mains" => Ok(ExamCategory::Mains),
            other => Err(format!("unknown exam category '{other}'")),
        }
    }
}

pub const MIN_QUESTIONS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Where generated questions come from: freshly generated, previous-year
/// questions, or an even split of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Mock,
    Pyq,
    Mixed,
}

impl FromStr for QuestionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(QuestionSource::Mock),
            "pyq" => Ok(QuestionSource::Pyq),
            "mixed" => Ok(QuestionSource::Mixed),
            other => Err(format!("unknown question source '{other}'")),
        }
    }
}

/// A paper offered for a given exam category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaperInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const PRELIMS_PAPERS: &[PaperInfo] = &[PaperInfo {
    id: "gs1",
    name: "GS Paper I",
    description: "History, Polity, Geography, Economy",
}];

const MAINS_PAPERS: &[PaperInfo] = &[
    PaperInfo {
        id: "gs1",
        name: "GS Paper 1",
        description: "Culture, History, Geography",
    },
    PaperInfo {
        id: "gs2",
        name: "GS Paper 2",
        description: "Polity, Governance, IR",
    },
    PaperInfo {
        id: "gs3",
        name: "GS Paper 3",
        description: "Economy, Tech, Environment",
    },
    PaperInfo {
        id: "gs4",
        name: "GS Paper 4",
        description: "Ethics, Integrity",
    },
];

/// All papers offered for `category`, in display order. Never empty.
pub fn papers_for(category: ExamCategory) -> &'static [PaperInfo] {
    match category {
        ExamCategory::Prelims => PRELIMS_PAPERS,
        ExamCategory::Mains => MAINS_PAPERS,
    }
}

/// The paper a fresh draft defaults to for `category`.
pub fn default_paper(category: ExamCategory) -> &'static str {
    papers_for(category)[0].id
}

pub fn is_valid_paper(category: ExamCategory, paper_id: &str) -> bool {
    papers_for(category).iter().any(|p| p.id == paper_id)
}

/// Draft configuration for a test. Mutable only while the session is
/// configuring; the setters keep the draft internally consistent, so a
/// draft is always submittable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfig {
    pub exam_category: ExamCategory,
    pub paper_id: String,
    pub question_count: u32,
    pub difficulty: Difficulty,
    pub question_source: QuestionSource,
    pub include_current_affairs: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            exam_category: ExamCategory::Prelims,
            paper_id: default_paper(ExamCategory::Prelims).to_string(),
            question_count: 10,
            difficulty: Difficulty::Medium,
            question_source: QuestionSource::Mock,
            include_current_affairs: false,
        }
    }
}

impl TestConfig {
    /// Switch category. The paper resets to the first paper offered for the
    /// new category and the question count is clamped into its range.
    pub fn set_exam_category(&mut self, category: ExamCategory) {
        self.exam_category = category;
        self.paper_id = default_paper(category).to_string();
        self.question_count = self
            .question_count
            .clamp(MIN_QUESTIONS, category.max_questions());
    }

    pub fn set_paper(&mut self, paper_id: &str) -> Result<(), ConfigError> {
        if !is_valid_paper(self.exam_category, paper_id) {
            return Err(ConfigError::UnknownPaper {
                paper: paper_id.to_string(),
                category: self.exam_category,
            });
        }
        self.paper_id = paper_id.to_string();
        Ok(())
    }

    /// Move the question count by `delta`, clamping to the category's range.
    pub fn adjust_question_count(&mut self, delta: i64) {
        let target = i64::from(self.question_count).saturating_add(delta);
        let max = i64::from(self.exam_category.max_questions());
        self.question_count = target.clamp(i64::from(MIN_QUESTIONS), max) as u32;
    }

    pub fn set_question_count(&mut self, count: u32) -> Result<(), ConfigError> {
        let max = self.exam_category.max_questions();
        if count < MIN_QUESTIONS || count > max {
            return Err(ConfigError::CountOutOfRange {
                count,
                min: MIN_QUESTIONS,
                max,
            });
        }
        self.question_count = count;
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    pub fn set_question_source(&mut self, source: QuestionSource) {
        self.question_source = source;
    }

    pub fn set_include_current_affairs(&mut self, include: bool) {
        self.include_current_affairs = include;
    }

    /// Check the paper/category pairing and the count range. The setters
    /// never leave a draft invalid; this guards drafts built by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_paper(self.exam_category, &self.paper_id) {
            return Err(ConfigError::UnknownPaper {
                paper: self.paper_id.clone(),
                category: self.exam_category,
            });
        }
        let max = self.exam_category.max_questions();
        if self.question_count < MIN_QUESTIONS || self.question_count > max {
            return Err(ConfigError::CountOutOfRange {
                count: self.question_count,
                min: MIN_QUESTIONS,
                max,
            });
        }
        Ok(())
    }
}
