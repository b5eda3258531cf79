//! Summarizer module — meeting summarization via a chat completions API
//!
//! Wraps an OpenAI-compatible chat completions endpoint. Given a transcript,
//! produces a required summary and, when the caller supplied no title, a
//! short generated title. The client never persists anything — storing the
//! result is the caller's concern.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::SummarizerConfig;

/// Characters of transcript fed to the title generation call.
const TITLE_CONTEXT_CHARS: usize = 500;

const TITLE_SYSTEM_PROMPT: &str = "Generate a short, concise and descriptive title for this \
meeting text. Return only the title, don't add anything else.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a meeting summarizer. Summarize the given meeting \
text by extracting main topics, decisions, and action items. Include date and title information \
at the beginning of the summary. Respond in English.";

// ============================================================================
// Error types
// ============================================================================

/// Summarization errors
#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("API key required. Supply api_key in the request or set OPENAI_API_KEY.")]
    MissingApiKey,

    #[error("Meeting text required")]
    MissingTranscript,

    #[error("No completion returned by the API")]
    MissingCompletion,
}

// ============================================================================
// Chat completions API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// SummarizerClient
// ============================================================================

/// Result of a summarization run.
#[derive(Debug, Clone)]
pub struct Summarization {
    pub summary: String,
    /// Present only when the title call ran (no caller-supplied title).
    pub generated_title: Option<String>,
}

/// Chat-completions client for titling and summarizing transcripts.
#[derive(Debug, Clone)]
pub struct SummarizerClient {
    client: Client,
    config: SummarizerConfig,
    base_url: String,
}

impl SummarizerClient {
    pub fn new(config: SummarizerConfig) -> Result<Self, SummarizerError> {
        let base_url = config.base_url.clone();
        Self::with_base_url(config, base_url)
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: SummarizerConfig,
        base_url: String,
    ) -> Result<Self, SummarizerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Summarize a transcript, generating a title first when the caller did
    /// not supply one. The per-call `api_key` takes precedence over the
    /// configured key; blank keys count as absent.
    ///
    /// Upstream failures are reported, not retried — retry policy belongs to
    /// the caller.
    pub async fn summarize(
        &self,
        transcript: &str,
        title: Option<&str>,
        date: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Summarization, SummarizerError> {
        let key = self.resolve_api_key(api_key)?;

        if transcript.trim().is_empty() {
            return Err(SummarizerError::MissingTranscript);
        }

        let supplied_title = title.map(str::trim).filter(|t| !t.is_empty());

        let generated_title = match supplied_title {
            Some(_) => None,
            None => Some(self.generate_title(transcript, &key).await?),
        };

        let context_title = supplied_title
            .map(str::to_string)
            .or_else(|| generated_title.clone());

        let summary = self
            .generate_summary(transcript, date, context_title.as_deref(), &key)
            .await?;

        Ok(Summarization {
            summary,
            generated_title,
        })
    }

    /// Per-call key first, then the configured key. Blank keys count as
    /// absent.
    fn resolve_api_key(&self, api_key: Option<&str>) -> Result<String, SummarizerError> {
        api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.config.api_key.clone().filter(|k| !k.is_empty()))
            .ok_or(SummarizerError::MissingApiKey)
    }

    async fn generate_title(
        &self,
        transcript: &str,
        api_key: &str,
    ) -> Result<String, SummarizerError> {
        let lead: String = transcript.chars().take(TITLE_CONTEXT_CHARS).collect();
        let user = format!("Generate title for this meeting:\n\n{}...", lead);

        let title = self
            .complete(TITLE_SYSTEM_PROMPT, &user, self.config.title_max_tokens, api_key)
            .await?;

        Ok(title.trim().to_string())
    }

    async fn generate_summary(
        &self,
        transcript: &str,
        date: Option<&str>,
        title: Option<&str>,
        api_key: &str,
    ) -> Result<String, SummarizerError> {
        let mut context = String::new();
        if let Some(d) = date.map(str::trim).filter(|d| !d.is_empty()) {
            context.push_str(&format!("Meeting Date: {}\n", d));
        }
        if let Some(t) = title {
            context.push_str(&format!("Title: {}\n\n", t));
        }

        let user = format!("{}Meeting Text:\n{}", context, transcript);

        self.complete(
            SUMMARY_SYSTEM_PROMPT,
            &user,
            self.config.summary_max_tokens,
            api_key,
        )
        .await
    }

    /// One chat completions call. Returns the first choice's content.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        api_key: &str,
    ) -> Result<String, SummarizerError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Chat completions API error");

            return Err(SummarizerError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(SummarizerError::MissingCompletion)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: Option<&str>) -> SummarizerConfig {
        SummarizerConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: api_key.map(str::to_string),
            title_max_tokens: 50,
            summary_max_tokens: 600,
            temperature: 0.3,
            timeout_seconds: 5,
        }
    }

    fn chat_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    fn mock_client(api_key: Option<&str>, server: &MockServer) -> SummarizerClient {
        SummarizerClient::with_base_url(test_config(api_key), server.uri())
            .expect("Failed to create client")
    }

    #[tokio::test]
    async fn test_supplied_title_skips_title_call() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        // Only the summary call may run: expect(1) fails the test on a
        // second (title) request.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Meeting Text:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("the summary")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client
            .summarize("we discussed X", Some("Standup"), Some("2024-05-01"), Some("test-key"))
            .await
            .expect("summarize should succeed");

        assert_eq!(result.summary, "the summary");
        assert!(result.generated_title.is_none());
    }

    #[tokio::test]
    async fn test_missing_title_generates_one_then_summarizes() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Generate title for this meeting:"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_response("  Planning Sync  ")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Meeting Text:"))
            .and(body_string_contains("Title: Planning Sync"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("the summary")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client
            .summarize("we planned the quarter", None, None, Some("test-key"))
            .await
            .expect("summarize should succeed");

        assert_eq!(result.summary, "the summary");
        // Whitespace from the model is stripped
        assert_eq!(result.generated_title.as_deref(), Some("Planning Sync"));
    }

    #[tokio::test]
    async fn test_date_context_is_prepended_to_summary_call() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        Mock::given(method("POST"))
            .and(body_string_contains("Meeting Date: 2024-05-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
            .expect(1)
            .mount(&mock_server)
            .await;

        client
            .summarize("we discussed X", Some("Standup"), Some("2024-05-01"), Some("test-key"))
            .await
            .expect("summarize should succeed");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_call() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        // No mocks mounted; any request would 404 and surface as an Api error
        let result = client.summarize("we discussed X", None, None, None).await;

        match result {
            Err(SummarizerError::MissingApiKey) => {}
            other => panic!("Expected MissingApiKey, got {:?}", other),
        }
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_api_key_falls_back_to_configured_key() {
        let mock_server = MockServer::start().await;
        let client = mock_client(Some("cfg-key"), &mock_server);

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer cfg-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
            .expect(1)
            .mount(&mock_server)
            .await;

        client
            .summarize("we discussed X", Some("Standup"), None, Some("   "))
            .await
            .expect("summarize should succeed with the configured key");
    }

    #[tokio::test]
    async fn test_empty_transcript_fails_before_any_call() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        let result = client.summarize("   ", None, None, Some("test-key")).await;

        match result {
            Err(SummarizerError::MissingTranscript) => {}
            other => panic!("Expected MissingTranscript, got {:?}", other),
        }
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_error_surfaces_code_and_message_without_retry() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "message": "boom", "type": "server_error" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client
            .summarize("we discussed X", Some("Standup"), None, Some("test-key"))
            .await;

        match result {
            Err(SummarizerError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_missing_completion() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        let result = client
            .summarize("we discussed X", Some("Standup"), None, Some("test-key"))
            .await;

        match result {
            Err(SummarizerError::MissingCompletion) => {}
            other => panic!("Expected MissingCompletion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_title_call_uses_transcript_lead_only() {
        let mock_server = MockServer::start().await;
        let client = mock_client(None, &mock_server);

        // 600-char transcript: the title prompt carries only the first 500
        let transcript = format!("{}{}", "a".repeat(500), "TAIL-MARKER");

        Mock::given(method("POST"))
            .and(body_string_contains("Generate title for this meeting:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("A Title")))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(body_string_contains("Meeting Text:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("summary")))
            .mount(&mock_server)
            .await;

        client
            .summarize(&transcript, None, None, Some("test-key"))
            .await
            .expect("summarize should succeed");

        let requests = mock_server.received_requests().await.unwrap();
        let title_request = requests
            .iter()
            .find(|r| String::from_utf8_lossy(&r.body).contains("Generate title"))
            .expect("title request should exist");
        assert!(!String::from_utf8_lossy(&title_request.body).contains("TAIL-MARKER"));
    }
}
