use crate::domain::tts::VoiceConfig;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

/// Audio delivered chunk by chunk, in playback order
pub type AudioStream = BoxStream<'static, Result<Vec<u8>, TtsError>>;

/// Provider failure, split by whether sending the same request again can help
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TtsError {
    /// Throttling, server errors, dropped connections
    #[error("{0}")]
    Transient(String),
    /// The provider refused the request itself: unknown voice, bad credentials,
    /// malformed input
    #[error("{0}")]
    Permanent(String),
}

impl TtsError {
    /// Classify an HTTP error status. 4xx is permanent except 408 and 429.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            408 | 429 => TtsError::Transient(message.into()),
            400..=499 => TtsError::Permanent(message.into()),
            _ => TtsError::Transient(message.into()),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, TtsError::Permanent(_))
    }
}

/// What a TTS provider hands back for one piece of text
pub enum SynthesizedAudio {
    /// Request/response providers return the whole payload at once
    Complete(Vec<u8>),
    /// Streaming providers yield chunks while synthesis is running
    Stream(AudioStream),
}

impl SynthesizedAudio {
    /// View either variant as a stream so callers never branch on it
    pub fn into_stream(self) -> AudioStream {
        match self {
            SynthesizedAudio::Complete(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            SynthesizedAudio::Stream(audio) => audio,
        }
    }
}

impl std::fmt::Debug for SynthesizedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesizedAudio::Complete(bytes) => {
                f.debug_tuple("Complete").field(&bytes.len()).finish()
            }
            SynthesizedAudio::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider (Google Translate, AWS Polly, OpenAI, ElevenLabs)
///
/// Implementations are responsible for:
/// - Handling provider-specific text length limitations
/// - Splitting text into batches if needed
/// - Concatenating audio chunks in order
/// - Provider-specific voice and rate handling
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Short provider name used in logs and the manifest
    fn provider(&self) -> &'static str;

    /// Extension of the files this provider produces
    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    /// Synthesize already cleaned text with the given voice settings
    ///
    /// # Errors
    /// `TtsError::Permanent` when the provider rejects the request,
    /// `TtsError::Transient` when it is unavailable or the call broke off
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesizedAudio, TtsError>;
}
