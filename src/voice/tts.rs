//! Text-to-speech over an external HTTP API
//!
//! Synthesis only: audio playback belongs to the platform layer behind the
//! [`Speaker`] seam, so `speak` resolves once the backend has produced
//! audio for the utterance.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::{Error, Result};

use super::Speaker;

/// Request timeout for the TTS endpoint
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Estimated speech rate used to size the narration watchdog
const MS_PER_CHAR: u64 = 70;

/// Synthesizes speech from text via an HTTP TTS provider
pub struct HttpTts {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    voice: String,
    speed: f32,
}

impl HttpTts {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(endpoint: Url, api_key: String, voice: String, speed: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key required for TTS".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            voice,
            speed,
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: "tts-1",
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Narration(format!("TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Narration(format!("TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Narration(format!("TTS body read failed: {e}")))?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl Speaker for HttpTts {
    async fn speak(&self, text: &str) -> Result<()> {
        let audio = self.synthesize(text).await?;
        tracing::debug!(bytes = audio.len(), "synthesized narration");
        Ok(())
    }

    fn estimate(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis(500 + MS_PER_CHAR * chars).div_f32(self.speed.max(0.25))
    }
}
