use super::tts_repository::{SynthesizedAudio, TtsError, TtsRepository};
use crate::domain::tts::{split_into_batches, VoiceConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

const MAX_BATCH_SIZE: usize = 5000;

/// "Josh", the English lesson voice
pub const DEFAULT_VOICE_ID: &str = "TxGEqnHWrfWFTfGW9XjX";

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// ElevenLabs text-to-speech REST API, complete MP3 payloads
pub struct ElevenLabsTtsRepository {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ElevenLabsTtsRepository {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    async fn call_elevenlabs(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, TtsError> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);
        let body = SpeechBody {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        tracing::info!(
            voice_id,
            model = %self.model,
            text_length = text.len(),
            "Calling ElevenLabs TTS API"
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::Transient(format!("ElevenLabs request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                detail = %detail,
                voice_id,
                "ElevenLabs TTS API call failed"
            );
            return Err(TtsError::from_status(
                status.as_u16(),
                format!("ElevenLabs returned HTTP {}: {}", status.as_u16(), detail),
            ));
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| TtsError::Transient(format!("Failed to read ElevenLabs audio: {}", e)))
    }
}

fn voice_id(voice: &VoiceConfig) -> &str {
    voice.voice.as_deref().unwrap_or(DEFAULT_VOICE_ID)
}

#[async_trait]
impl TtsRepository for ElevenLabsTtsRepository {
    fn provider(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesizedAudio, TtsError> {
        let start_time = std::time::Instant::now();
        let voice_id = voice_id(voice);
        let batches = split_into_batches(text, MAX_BATCH_SIZE);
        let mut merged_audio = Vec::new();

        for batch in &batches {
            merged_audio.extend(self.call_elevenlabs(batch, voice_id).await?);
        }

        tracing::info!(
            provider = "elevenlabs",
            voice_id,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = text.len(),
            batch_count = batches.len(),
            audio_size_bytes = merged_audio.len(),
            "TTS synthesis completed"
        );

        Ok(SynthesizedAudio::Complete(merged_audio))
    }
}
