use crate::error::PipelineError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;

/// Fixed user-facing answer when the completion endpoint fails in any way.
pub const FALLBACK_ANSWER: &str = "unable to generate a response";

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            max_tokens: 1_024,
        }
    }
}

/// Composes the single user-role prompt sent to the chat-completion
/// endpoint: answer from the excerpts only, cite the source document, and
/// say so when nothing relevant is there.
pub fn compose_prompt(question: &str, context: &str) -> String {
    format!(
        "The user asked:\n{question}\n\n\
         Below are excerpts from the technical manuals and documents:\n{context}\n\n\
         Based on these documents, answer as usefully and technically as possible. \
         Be brief and direct, cite the source document name when relevant, and state \
         explicitly if the excerpts contain no relevant information."
    )
}

/// Generates the answer for a question given an assembled context. By
/// contract this never fails: any transport or parsing problem collapses to
/// [`FALLBACK_ANSWER`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, question: &str, context: &str) -> String;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint (Groq in
/// the default configuration).
pub struct OpenAiCompatClient {
    endpoint: String,
    api_key: Option<String>,
    options: CompletionOptions,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        options: CompletionOptions,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            options,
            client,
        })
    }

    async fn try_complete(&self, prompt: &str) -> Result<String, PipelineError> {
        let mut request = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.endpoint.trim_end_matches('/')
            ))
            .json(&json!({
                "model": self.options.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": self.options.temperature,
                "max_tokens": self.options.max_tokens,
            }));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "completion".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let answer = parsed
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(PipelineError::BackendResponse {
                backend: "completion".to_string(),
                details: "empty generated answer".to_string(),
            });
        }

        Ok(answer.to_string())
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, question: &str, context: &str) -> String {
        let prompt = compose_prompt(question, context);

        match self.try_complete(&prompt).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(%error, "completion request failed");
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer, timeout: Duration) -> OpenAiCompatClient {
        OpenAiCompatClient::new(
            server.base_url(),
            Some("test-key".to_string()),
            CompletionOptions::default(),
            timeout,
        )
        .unwrap()
    }

    #[test]
    fn prompt_carries_question_and_context() {
        let prompt = compose_prompt("how do I reset", "document: doc.pdf\nexcerpt: hold reset");
        assert!(prompt.contains("how do I reset"));
        assert!(prompt.contains("document: doc.pdf"));
        assert!(prompt.contains("cite the source document"));
    }

    #[tokio::test]
    async fn successful_completion_returns_the_generated_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(serde_json::json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "  Hold the button.  " } }
                    ]
                }));
            })
            .await;

        let answer = client(&server, Duration::from_secs(5))
            .complete("how do I reset", "some context")
            .await;

        mock.assert_async().await;
        assert_eq!(answer, "Hold the button.");
    }

    #[tokio::test]
    async fn non_2xx_status_yields_the_fallback_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500);
            })
            .await;

        let answer = client(&server, Duration::from_secs(5))
            .complete("question", "context")
            .await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn malformed_json_yields_the_fallback_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).body("this is not json");
            })
            .await;

        let answer = client(&server, Duration::from_secs(5))
            .complete("question", "context")
            .await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn empty_generated_answer_yields_the_fallback_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(serde_json::json!({
                    "choices": [ { "message": { "role": "assistant", "content": "   " } } ]
                }));
            })
            .await;

        let answer = client(&server, Duration::from_secs(5))
            .complete("question", "context")
            .await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn timeout_yields_the_fallback_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(serde_json::json!({
                        "choices": [ { "message": { "content": "too late" } } ]
                    }));
            })
            .await;

        let answer = client(&server, Duration::from_millis(50))
            .complete("question", "context")
            .await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }
}
