//! HTTP implementations of the collaborator traits, speaking the backend's
//! mock-test API: `POST /api/mock/generate` and `POST /api/mock/submit/{id}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GenerationError, SubmissionError};
use crate::model::{AnswerSheet, MockTest, Question, ScoreReport};
use crate::provider::{GenerationRequest, ScoreRequest, Scorer, TestProvider};

/// Wire shape of a generation response. The backend reports the duration
/// in whole minutes; everything else is carried through.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    test_id: String,
    questions: Vec<Question>,
    duration_minutes: u64,
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    answers: &'a AnswerSheet,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    score: u32,
    total: u32,
}

/// Test provider backed by the generation endpoint.
pub struct HttpTestProvider {
    client: reqwest::Client,
    base: Url,
}

impl HttpTestProvider {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

#[async_trait]
impl TestProvider for HttpTestProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<MockTest, GenerationError> {
        let url = self
            .base
            .join("/api/mock/generate")
            .map_err(|e| GenerationError::Endpoint(e.to_string()))?;
        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body: GenerateResponse = response.json().await?;
        Ok(MockTest {
            test_id: body.test_id,
            questions: body.questions,
            duration_secs: body.duration_minutes.saturating_mul(60),
        })
    }
}

/// Scorer backed by the submission endpoint.
pub struct HttpScorer {
    client: reqwest::Client,
    base: Url,
}

impl HttpScorer {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreReport, SubmissionError> {
        let url = self
            .base
            .join(&format!("/api/mock/submit/{}", request.test_id))
            .map_err(|e| SubmissionError::Endpoint(e.to_string()))?;
        let body = SubmitBody {
            answers: &request.answers,
        };
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body: SubmitResponse = response.json().await?;
        Ok(ScoreReport {
            score: body.score,
            total: body.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestConfig;

    fn request() -> GenerationRequest {
        GenerationRequest::from(&TestConfig::default())
    }

    #[tokio::test]
    async fn generate_parses_response_and_converts_duration() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/mock/generate")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "exam_type": "prelims",
                "paper_type": "gs1",
                "num_questions": 10,
            })))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "test_id": "test_4242",
                    "questions": [
                        {
                            "id": "mock_10001",
                            "question": "Which river?",
                            "options": ["Ganga", "Yamuna", "Kaveri", "Godavari"],
                            "correct_answer": "Ganga",
                            "explanation": "",
                            "marks": 2,
                            "topic": "gs1",
                            "difficulty": "medium"
                        },
                        {
                            "id": "mock_10002",
                            "question": "Discuss.",
                            "options": null,
                            "marks": 10,
                            "topic": "gs1",
                            "difficulty": "medium"
                        }
                    ],
                    "duration_minutes": 20
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = HttpTestProvider::new(Url::parse(&server.url()).unwrap());
        let test = provider.generate(&request()).await.unwrap();
        mock.assert_async().await;

        assert_eq!(test.test_id, "test_4242");
        assert_eq!(test.len(), 2);
        assert_eq!(test.duration_secs, 1200);
        assert_eq!(test.questions[0].prompt, "Which river?");
        assert_eq!(test.questions[0].options.len(), 4);
        assert!(test.questions[1].options.is_empty());
        assert!(test.validate().is_ok());
    }

    #[tokio::test]
    async fn generate_maps_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/mock/generate")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider = HttpTestProvider::new(Url::parse(&server.url()).unwrap());
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Api { status: 500, ref message } if message == "boom"
        ));
    }

    #[tokio::test]
    async fn generate_maps_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/mock/generate")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let provider = HttpTestProvider::new(Url::parse(&server.url()).unwrap());
        let err = provider.generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[tokio::test]
    async fn score_posts_sheet_to_test_path_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/mock/submit/test_4242")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "answers": {"q1": "A", "q2": "C"}
            })))
            .with_status(200)
            .with_body(r#"{"test_id":"test_4242","score":1,"total":2,"details":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let mut answers = AnswerSheet::new();
        answers.record("q1", "A");
        answers.record("q2", "C");
        let scorer = HttpScorer::new(Url::parse(&server.url()).unwrap());
        let report = scorer
            .score(&ScoreRequest {
                test_id: "test_4242".into(),
                answers,
            })
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(report, ScoreReport { score: 1, total: 2 });
    }

    #[tokio::test]
    async fn score_maps_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/mock/submit/test_4242")
            .with_status(503)
            .create_async()
            .await;

        let scorer = HttpScorer::new(Url::parse(&server.url()).unwrap());
        let err = scorer
            .score(&ScoreRequest {
                test_id: "test_4242".into(),
                answers: AnswerSheet::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Api { status: 503, .. }));
    }
}
