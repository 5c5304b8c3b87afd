use super::tts_repository::{AudioStream, SynthesizedAudio, TtsError, TtsRepository};
use crate::domain::tts::language::polly_voice_for_language;
use crate::domain::tts::{split_into_batches, SpeechRate, VoiceConfig};
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, OutputFormat, TextType, VoiceId},
    Client as PollyClient,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

/// AWS Polly bills at most 3000 characters per request; leave room for SSML escaping
const MAX_BATCH_SIZE: usize = 2500;

/// AWS Polly neural voices, streamed.
///
/// The response body is forwarded chunk by chunk as Polly produces it.
/// Long text is split into batches whose streams are chained in order.
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    fn voice_name(voice: &VoiceConfig) -> String {
        voice
            .voice
            .clone()
            .unwrap_or_else(|| polly_voice_for_language(voice.language).to_string())
    }
}

/// Wrap text in SSML prosody so Polly applies the relative rate
fn build_ssml(text: &str, rate: SpeechRate) -> String {
    format!(
        "<speak><prosody rate=\"{}\">{}</prosody></speak>",
        rate,
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Start one Polly synthesis and expose its body as an audio stream
async fn open_polly_stream(
    client: Arc<PollyClient>,
    text: String,
    voice_name: String,
    rate: SpeechRate,
) -> Result<AudioStream, TtsError> {
    let (text_type, input) = if rate.is_default() {
        (TextType::Text, text)
    } else {
        (TextType::Ssml, build_ssml(&text, rate))
    };
    let voice_id = VoiceId::from(voice_name.as_str());
    let engine = Engine::Neural;

    tracing::info!(
        voice = %voice_name,
        rate = %rate,
        text_type = ?text_type,
        engine = ?engine,
        output_format = "Mp3",
        text_length = input.len(),
        "Calling AWS Polly synthesize_speech"
    );

    let output = client
        .synthesize_speech()
        .text(input)
        .text_type(text_type)
        .voice_id(voice_id)
        .output_format(OutputFormat::Mp3)
        .engine(engine)
        .send()
        .await
        .map_err(|e| {
            let status = e.raw_response().map(|response| response.status().as_u16());
            tracing::error!(
                error = ?e,
                error_display = %e,
                status,
                voice = %voice_name,
                "AWS Polly synthesize_speech failed"
            );
            let message = format!("AWS Polly error: {}", e);
            match status {
                Some(status) => TtsError::from_status(status, message),
                // Never got an answer: connect failure, timeout, dispatch error
                None => TtsError::Transient(message),
            }
        })?;

    let audio = stream::unfold(output.audio_stream, |mut body| async move {
        let chunk = body.next().await?;
        let chunk = chunk
            .map(|bytes| bytes.to_vec())
            .map_err(|e| TtsError::Transient(format!("Failed to read Polly audio stream: {}", e)));
        Some((chunk, body))
    });

    Ok(audio.boxed())
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    fn provider(&self) -> &'static str {
        "polly"
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesizedAudio, TtsError> {
        let voice_name = Self::voice_name(voice);
        let rate = voice.rate;
        let batches = split_into_batches(text, MAX_BATCH_SIZE);

        tracing::info!(
            batch_count = batches.len(),
            text_length = text.len(),
            voice = %voice_name,
            "Text split into batches"
        );

        let mut batches = batches.into_iter();
        let first = batches
            .next()
            .ok_or_else(|| TtsError::Permanent("Nothing to synthesize".to_string()))?;

        // The first request runs here so that rejected voices or credentials
        // fail the call itself rather than the stream
        let client = self.polly_client.clone();
        let first_stream =
            open_polly_stream(client.clone(), first, voice_name.clone(), rate).await?;

        let remaining = stream::iter(batches)
            .then(move |batch| open_polly_stream(client.clone(), batch, voice_name.clone(), rate))
            .try_flatten();

        Ok(SynthesizedAudio::Stream(first_stream.chain(remaining).boxed()))
    }
}
