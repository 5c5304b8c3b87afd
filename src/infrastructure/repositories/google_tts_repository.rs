use super::tts_repository::{SynthesizedAudio, TtsError, TtsRepository};
use crate::domain::tts::{split_into_batches, VoiceConfig};
use async_trait::async_trait;
use reqwest::Client;

/// Google Translate TTS rejects longer inputs
const MAX_BATCH_SIZE: usize = 200;

const NORMAL_SPEED: &str = "1";
const SLOW_SPEED: &str = "0.3";

/// Google Translate TTS: one request per batch, complete MP3 payloads.
/// Only the language and slow flag are honoured; there is no voice or rate control.
pub struct GoogleTtsRepository {
    client: Client,
    base_url: String,
}

impl GoogleTtsRepository {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn call_google(
        &self,
        text: &str,
        index: usize,
        total: usize,
        voice: &VoiceConfig,
    ) -> Result<Vec<u8>, TtsError> {
        let url = format!("{}/translate_tts", self.base_url);
        let speed = if voice.slow { SLOW_SPEED } else { NORMAL_SPEED };
        let total = total.to_string();
        let index = index.to_string();
        let text_len = text.chars().count().to_string();

        tracing::debug!(
            language = %voice.language,
            slow = voice.slow,
            text_length = text.len(),
            "Calling Google Translate TTS"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", voice.language.as_str()),
                ("q", text),
                ("total", total.as_str()),
                ("idx", index.as_str()),
                ("textlen", text_len.as_str()),
                ("ttsspeed", speed),
            ])
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Google TTS request failed");
                TtsError::Transient(format!("Google TTS error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Google TTS returned an error status");
            return Err(TtsError::from_status(
                status.as_u16(),
                format!("Google TTS returned HTTP {}", status.as_u16()),
            ));
        }

        let audio_bytes = response
            .bytes()
            .await
            .map_err(|e| TtsError::Transient(format!("Failed to read Google TTS audio: {}", e)))?
            .to_vec();

        Ok(audio_bytes)
    }
}

#[async_trait]
impl TtsRepository for GoogleTtsRepository {
    fn provider(&self) -> &'static str {
        "google"
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesizedAudio, TtsError> {
        let start_time = std::time::Instant::now();
        let batches = split_into_batches(text, MAX_BATCH_SIZE);
        let mut merged_audio = Vec::new();

        for (index, batch) in batches.iter().enumerate() {
            let audio_data = self.call_google(batch, index, batches.len(), voice).await?;
            merged_audio.extend(audio_data);
        }

        tracing::info!(
            provider = "google",
            language = %voice.language,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = text.len(),
            batch_count = batches.len(),
            audio_size_bytes = merged_audio.len(),
            "TTS synthesis completed"
        );

        Ok(SynthesizedAudio::Complete(merged_audio))
    }
}
