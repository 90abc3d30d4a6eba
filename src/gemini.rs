//! Gemini API client for free-form answer generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::resolver::{AnswerError, Answerer};

const GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Hard deadline for a completion; expiry is handled by the resolver like
/// any other failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self { api_key, client }
    }
}

#[async_trait]
impl Answerer for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AnswerError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
        };

        let url = format!("{}?key={}", GEMINI_API_URL, self.api_key);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnswerError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnswerError::Http(e.to_string()))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(AnswerError::Api(format!("{status}: {body}")));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| AnswerError::Parse(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(AnswerError::Api(error.message));
        }

        let text = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|parts| parts.into_iter().find_map(|p| p.text));

        match text {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(AnswerError::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "The library opens at 8am."}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        let text = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|parts| parts.into_iter().find_map(|p| p.text));
        assert_eq!(text.as_deref(), Some("The library opens at 8am."));
    }

    #[test]
    fn test_error_body_parsing() {
        let body = r#"{"error": {"message": "API key not valid"}}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.unwrap().message, "API key not valid");
        assert!(parsed.candidates.is_none());
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: "hello".into() }] }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }
}
