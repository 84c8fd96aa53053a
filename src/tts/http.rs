//! Клиент HTTP-сервера синтеза речи с клонированием голоса
//!
//! Сервер принимает multipart-форму с текстом, языком и референсным
//! клипом и возвращает аудио в теле ответа.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use tokio::fs;

use crate::error::{DubError, Result};
use crate::tts::SpeechSynthesizer;

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Движок синтеза, работающий через HTTP API
#[derive(Debug, Clone)]
pub struct HttpSpeechEngine {
    client: Client,
    endpoint: String,
}

impl HttpSpeechEngine {
    /// Создать клиент для `endpoint` (например, `http://127.0.0.1:8020/tts`)
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(DubError::Configuration("TTS endpoint is required".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DubError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechEngine {
    async fn synthesize(
        &self,
        text: &str,
        reference: &Path,
        language: &str,
        output: &Path,
    ) -> Result<PathBuf> {
        let reference_bytes = fs::read(reference).await?;
        let file_name = reference
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reference.wav".to_string());

        let reference_part = multipart::Part::bytes(reference_bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let form = multipart::Form::new()
            .text("text", text.to_string())
            .text("language", language.to_string())
            .part("reference_audio", reference_part);

        log::debug!("Sending TTS request ({} chars) to {}", text.chars().count(), self.endpoint);
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DubError::Synthesis(format!(
                "TTS request failed with status {}: {}",
                status, error_text
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(DubError::Synthesis("TTS server returned empty audio".to_string()));
        }

        fs::write(output, &bytes).await?;
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_endpoint_rejected() {
        assert!(matches!(
            HttpSpeechEngine::new("  "),
            Err(DubError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_reference_fails_before_request() {
        let engine = HttpSpeechEngine::new("http://127.0.0.1:9/tts").unwrap();
        let temp_dir = tempfile::tempdir().unwrap();
        let result = engine
            .synthesize(
                "hello",
                &temp_dir.path().join("missing.wav"),
                "en",
                &temp_dir.path().join("out.wav"),
            )
            .await;
        assert!(matches!(result, Err(DubError::Io(_))));
    }
}
