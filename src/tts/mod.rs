pub mod format;

use std::time::Duration;

use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::ElevenLabsConfig;
use crate::error::AppError;

pub use format::OutputFormat;

/// Multilingual model used for every synthesis request.
pub const MODEL_ID: &str = "eleven_multilingual_v2";

const VENDOR_ERROR: &str = "ElevenLabs API error";
const REQUEST_FAILED: &str = "TTS request failed";

/// Voice tuning supplied by the caller. Unset fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceSettingsOverrides {
    pub stability: Option<f64>,
    pub similarity_boost: Option<f64>,
    pub style: Option<f64>,
    pub use_speaker_boost: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.20,
            similarity_boost: 0.90,
            style: 0.30,
            use_speaker_boost: true,
        }
    }
}

impl VoiceSettings {
    pub fn with_overrides(overrides: &VoiceSettingsOverrides) -> Self {
        let defaults = Self::default();
        Self {
            stability: overrides.stability.unwrap_or(defaults.stability),
            similarity_boost: overrides
                .similarity_boost
                .unwrap_or(defaults.similarity_boost),
            style: overrides.style.unwrap_or(defaults.style),
            use_speaker_boost: overrides
                .use_speaker_boost
                .unwrap_or(defaults.use_speaker_boost),
        }
    }
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Synthesized audio as returned by the vendor.
#[derive(Debug)]
pub struct Speech {
    pub audio: Vec<u8>,
    pub format: OutputFormat,
}

pub struct TtsService {
    client: Client,
    config: ElevenLabsConfig,
}

impl TtsService {
    pub fn new(client: Client, config: ElevenLabsConfig) -> Self {
        Self { client, config }
    }

    /// Forward `text` to the ElevenLabs voice endpoint, giving up after `timeout`.
    ///
    /// `text` is expected to be validated by the caller.
    pub async fn synthesize(
        &self,
        text: &str,
        overrides: &VoiceSettingsOverrides,
        format: OutputFormat,
        timeout: Duration,
    ) -> Result<Speech, AppError> {
        let (api_key, voice_id) = match (&self.config.api_key, &self.config.voice_id) {
            (Some(key), Some(voice)) => (key, voice),
            _ => return Err(AppError::Misconfigured("ElevenLabs credentials missing")),
        };

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        );

        tracing::debug!(
            "ElevenLabs TTS request: voice={}, format={}, input_len={}",
            voice_id,
            format.as_str(),
            text.len()
        );

        let body = ElevenLabsRequest {
            text,
            model_id: MODEL_ID,
            voice_settings: VoiceSettings::with_overrides(overrides),
        };

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", format.as_str())])
            .header("xi-api-key", api_key.expose_secret())
            .header(header::ACCEPT, format.content_type())
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(e, timeout))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!("ElevenLabs API error ({}): {}", status, error_text);

            return Err(AppError::Vendor {
                status,
                error: VENDOR_ERROR,
                detail: error_text,
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| request_failed(e, timeout))?;

        tracing::debug!("ElevenLabs TTS synthesis complete, {} bytes", audio.len());

        Ok(Speech {
            audio: audio.to_vec(),
            format,
        })
    }
}

fn request_failed(err: reqwest::Error, timeout: Duration) -> AppError {
    let detail = if err.is_timeout() {
        format!(
            "ElevenLabs request aborted after {} seconds",
            timeout.as_secs()
        )
    } else {
        err.to_string()
    };

    tracing::error!("ElevenLabs request failed: {}", detail);

    AppError::Upstream {
        error: REQUEST_FAILED,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(base_url: &str) -> TtsService {
        TtsService::new(
            Client::new(),
            ElevenLabsConfig {
                api_key: Some(SecretString::from("el-test-key")),
                voice_id: Some("voice-123".to_string()),
                base_url: base_url.to_string(),
            },
        )
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn overrides_merge_over_defaults() {
        let merged = VoiceSettings::with_overrides(&VoiceSettingsOverrides {
            stability: Some(0.5),
            use_speaker_boost: Some(false),
            ..Default::default()
        });
        assert_eq!(merged.stability, 0.5);
        assert_eq!(merged.similarity_boost, 0.90);
        assert_eq!(merged.style, 0.30);
        assert!(!merged.use_speaker_boost);
    }

    #[tokio::test]
    async fn sends_voice_request_and_returns_audio() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-123"))
            .and(query_param("output_format", "wav_22050"))
            .and(header_eq("xi-api-key", "el-test-key"))
            .and(header_eq("accept", "audio/wav"))
            .and(body_partial_json(serde_json::json!({
                "text": "Hello class",
                "model_id": "eleven_multilingual_v2",
                "voice_settings": {
                    "similarity_boost": 0.9,
                    "use_speaker_boost": true
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFfake".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let speech = service(&server.uri())
            .synthesize(
                "Hello class",
                &VoiceSettingsOverrides::default(),
                OutputFormat::default(),
                TIMEOUT,
            )
            .await
            .unwrap();

        assert_eq!(speech.audio, b"RIFFfake");
        assert_eq!(speech.format.content_type(), "audio/wav");
    }

    #[tokio::test]
    async fn relays_vendor_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .synthesize(
                "Hello",
                &VoiceSettingsOverrides::default(),
                OutputFormat::default(),
                TIMEOUT,
            )
            .await
            .unwrap_err();

        match err {
            AppError::Vendor { status, detail, .. } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(detail, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_voice_id_is_misconfiguration() {
        let tts = TtsService::new(
            Client::new(),
            ElevenLabsConfig {
                api_key: Some(SecretString::from("el-test-key")),
                voice_id: None,
                base_url: "http://127.0.0.1:9".to_string(),
            },
        );

        let err = tts
            .synthesize(
                "Hello",
                &VoiceSettingsOverrides::default(),
                OutputFormat::default(),
                TIMEOUT,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Misconfigured(_)));
    }

    #[tokio::test]
    async fn slow_vendor_is_aborted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .synthesize(
                "Hello",
                &VoiceSettingsOverrides::default(),
                OutputFormat::default(),
                Duration::from_millis(200),
            )
            .await
            .unwrap_err();

        match err {
            AppError::Upstream { error, .. } => assert_eq!(error, "TTS request failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
