pub mod language;
pub mod rate;
pub mod text;

pub use language::{detect_language, LanguageCode, LanguageSetting};
pub use rate::SpeechRate;
pub use text::{clean_text, split_into_batches};

/// Voice settings handed to a TTS backend for one narration.
///
/// Backends read the fields they understand: Google only uses `language`
/// and `slow`, Polly and OpenAI use `voice` and `rate`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoiceConfig {
    pub voice: Option<String>,
    pub language: LanguageCode,
    pub rate: SpeechRate,
    pub slow: bool,
}
