pub mod prompt;

use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::AppError;

pub use prompt::FALLBACK_EXPLANATION;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f64 = 0.7;

const VENDOR_ERROR: &str = "OpenAI API error";
const REQUEST_FAILED: &str = "Explain request failed";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: [ContentPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn into_explanation(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| FALLBACK_EXPLANATION.to_string())
    }
}

/// Inline image as a `data:` URI, the form vision models accept for uploads.
pub fn data_uri(image_base64: &str, mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, image_base64)
}

/// Pull a readable message out of an OpenAI error body.
fn vendor_error_detail(body: &serde_json::Value) -> String {
    body.pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

pub struct ExplainService {
    client: Client,
    config: OpenAiConfig,
}

impl ExplainService {
    pub fn new(client: Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }

    /// Ask the vision model for a short spoken-style explanation of an image.
    pub async fn explain(
        &self,
        image_base64: &str,
        mime_type: &str,
        timeout: Duration,
    ) -> Result<String, AppError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(AppError::Misconfigured("OpenAI API key missing"))?;

        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        tracing::debug!(
            "OpenAI explain request: model={}, mime_type={}, image_len={}",
            self.config.model,
            mime_type,
            image_base64.len()
        );

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: [
                    ContentPart::Text {
                        text: &self.config.explain_prompt,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_uri(image_base64, mime_type),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(e, timeout))?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error_body = serde_json::from_str(&text)
                .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
            let detail = vendor_error_detail(&error_body);

            tracing::error!("OpenAI API error ({}): {}", status, detail);

            return Err(AppError::Vendor {
                status,
                error: VENDOR_ERROR,
                detail,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| request_failed(e, timeout))?;

        let explanation = completion.into_explanation();

        tracing::debug!("OpenAI explain complete, {} chars", explanation.len());

        Ok(explanation)
    }
}

fn request_failed(err: reqwest::Error, timeout: Duration) -> AppError {
    let detail = if err.is_timeout() {
        format!("OpenAI request aborted after {} seconds", timeout.as_secs())
    } else {
        err.to_string()
    };

    tracing::error!("OpenAI request failed: {}", detail);

    AppError::Upstream {
        error: REQUEST_FAILED,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::prompt::DEFAULT_EXPLAIN_PROMPT;
    use axum::http::StatusCode;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn service(base_url: &str) -> ExplainService {
        ExplainService::new(
            Client::new(),
            OpenAiConfig {
                api_key: Some(SecretString::from("sk-test")),
                base_url: base_url.to_string(),
                model: "gpt-4o".to_string(),
                explain_prompt: DEFAULT_EXPLAIN_PROMPT.to_string(),
            },
        )
    }

    #[test]
    fn builds_data_uri() {
        assert_eq!(data_uri("AAAA", "image/png"), "data:image/png;base64,AAAA");
    }

    #[test]
    fn empty_response_uses_fallback() {
        let response: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.into_explanation(), FALLBACK_EXPLANATION);
    }

    #[test]
    fn null_content_uses_fallback() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(response.into_explanation(), FALLBACK_EXPLANATION);
    }

    #[test]
    fn error_detail_prefers_message() {
        let body = serde_json::json!({ "error": { "message": "Invalid image" } });
        assert_eq!(vendor_error_detail(&body), "Invalid image");

        let empty = serde_json::json!({});
        assert_eq!(vendor_error_detail(&empty), "{}");
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "max_tokens": 1500,
                "temperature": 0.7,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": DEFAULT_EXPLAIN_PROMPT },
                        { "type": "image_url", "image_url": { "url": "data:image/png;base64,iVBORw0K" } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "This diagram shows a cell." } },
                    { "message": { "role": "assistant", "content": "Ignored." } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let explanation = service(&server.uri())
            .explain("iVBORw0K", "image/png", TIMEOUT)
            .await
            .unwrap();

        assert_eq!(explanation, "This diagram shows a cell.");
    }

    #[tokio::test]
    async fn no_choices_returns_fallback() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let explanation = service(&server.uri())
            .explain("AAAA", DEFAULT_MIME_TYPE, TIMEOUT)
            .await
            .unwrap();

        assert_eq!(explanation, FALLBACK_EXPLANATION);
    }

    #[tokio::test]
    async fn relays_vendor_error_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Invalid image data", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .explain("not-an-image", DEFAULT_MIME_TYPE, TIMEOUT)
            .await
            .unwrap_err();

        match err {
            AppError::Vendor { status, detail, .. } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(detail, "Invalid image data");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tolerates_non_json_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .explain("AAAA", DEFAULT_MIME_TYPE, TIMEOUT)
            .await
            .unwrap_err();

        match err {
            AppError::Vendor { status, detail, .. } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(detail, "{}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_vendor_is_aborted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "choices": [] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .explain("AAAA", DEFAULT_MIME_TYPE, Duration::from_millis(200))
            .await
            .unwrap_err();

        match err {
            AppError::Upstream { error, detail } => {
                assert_eq!(error, "Explain request failed");
                assert!(detail.starts_with("OpenAI request aborted"), "{detail}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_vendor_is_upstream_failure() {
        let err = service("http://127.0.0.1:9")
            .explain("AAAA", DEFAULT_MIME_TYPE, TIMEOUT)
            .await
            .unwrap_err();

        match err {
            AppError::Upstream { error, detail } => {
                assert_eq!(error, "Explain request failed");
                assert!(!detail.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_api_key_is_misconfiguration() {
        let explain = ExplainService::new(
            Client::new(),
            OpenAiConfig {
                api_key: None,
                base_url: "http://127.0.0.1:9".to_string(),
                model: "gpt-4o".to_string(),
                explain_prompt: DEFAULT_EXPLAIN_PROMPT.to_string(),
            },
        );

        let err = explain
            .explain("AAAA", DEFAULT_MIME_TYPE, TIMEOUT)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Misconfigured(_)));
    }
}
