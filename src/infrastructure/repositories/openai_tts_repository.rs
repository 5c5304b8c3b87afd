use super::tts_repository::{SynthesizedAudio, TtsError, TtsRepository};
use crate::domain::tts::language::openai_voice_for_language;
use crate::domain::tts::{split_into_batches, VoiceConfig};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI has a limit of 4096 characters per request
const MAX_BATCH_SIZE: usize = 4096;

/// OpenAI accepts speeds between 0.25 and 4.0
const MIN_SPEED: f32 = 0.25;
const MAX_SPEED: f32 = 4.0;

/// OpenAI TTS implementation of TTS repository
pub struct OpenAiTtsRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiTtsRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }

    /// Call OpenAI TTS API to synthesize a single text batch
    async fn call_openai(&self, text: &str, voice: Voice, speed: f32) -> Result<Vec<u8>, TtsError> {
        tracing::info!(
            model = %self.model,
            voice = ?voice,
            speed,
            text_length = text.len(),
            "Calling OpenAI TTS API"
        );

        let request = CreateSpeechRequest {
            model: self.speech_model(),
            input: text.to_string(),
            voice,
            response_format: None, // Defaults to MP3
            speed: Some(speed),
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.model,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            classify_error(e)
        })?;

        Ok(response.bytes.to_vec())
    }
}

/// The client already backs off on throttling and server errors, so what
/// reaches us is either a rejected request or a failed connection
fn classify_error(err: OpenAIError) -> TtsError {
    let message = format!("OpenAI TTS error: {}", err);
    match &err {
        OpenAIError::ApiError(api)
            if matches!(
                api.r#type.as_deref(),
                Some("invalid_request_error") | Some("insufficient_quota")
            ) =>
        {
            TtsError::Permanent(message)
        }
        OpenAIError::InvalidArgument(_) => TtsError::Permanent(message),
        _ => TtsError::Transient(message),
    }
}

/// Voice requested for this item, or the language default
fn resolve_voice(voice: &VoiceConfig) -> Result<Voice, TtsError> {
    let name = voice
        .voice
        .as_deref()
        .unwrap_or_else(|| openai_voice_for_language(voice.language));
    parse_voice(name).map_err(TtsError::Permanent)
}

fn parse_voice(name: &str) -> Result<Voice, String> {
    match name.to_lowercase().as_str() {
        "alloy" => Ok(Voice::Alloy),
        "echo" => Ok(Voice::Echo),
        "fable" => Ok(Voice::Fable),
        "onyx" => Ok(Voice::Onyx),
        "nova" => Ok(Voice::Nova),
        "shimmer" => Ok(Voice::Shimmer),
        other => Err(format!("Unknown OpenAI voice: {}", other)),
    }
}

#[async_trait]
impl TtsRepository for OpenAiTtsRepository {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesizedAudio, TtsError> {
        let start_time = std::time::Instant::now();

        // An unknown voice is a request error, not something to silently replace
        let voice_enum = resolve_voice(voice)?;
        let speed = voice.rate.speed_factor().clamp(MIN_SPEED, MAX_SPEED);

        let batches = split_into_batches(text, MAX_BATCH_SIZE);
        let mut merged_audio = Vec::new();

        for (index, batch) in batches.iter().enumerate() {
            tracing::debug!(batch_index = index, batch_size = batch.len(), "Synthesizing batch");
            let audio_data = self.call_openai(batch, voice_enum.clone(), speed).await?;
            merged_audio.extend(audio_data);
        }

        tracing::info!(
            provider = "openai",
            model = %self.model,
            voice = ?voice_enum,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = text.len(),
            batch_count = batches.len(),
            audio_size_bytes = merged_audio.len(),
            "TTS synthesis completed"
        );

        Ok(SynthesizedAudio::Complete(merged_audio))
    }
}
