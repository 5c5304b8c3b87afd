use lingua::{Language, LanguageDetectorBuilder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// ISO 639-1 language codes supported for narration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LanguageCode {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "pt")]
    Portuguese,
}

impl LanguageCode {
    /// Get the ISO 639-1 code as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::English => "en",
            LanguageCode::Spanish => "es",
            LanguageCode::French => "fr",
            LanguageCode::German => "de",
            LanguageCode::Italian => "it",
            LanguageCode::Portuguese => "pt",
        }
    }

    /// Convert lingua Language to LanguageCode
    pub fn from_lingua(language: Language) -> Self {
        match language {
            Language::English => LanguageCode::English,
            Language::Spanish => LanguageCode::Spanish,
            Language::French => LanguageCode::French,
            Language::German => LanguageCode::German,
            Language::Italian => LanguageCode::Italian,
            Language::Portuguese => LanguageCode::Portuguese,
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(LanguageCode::English),
            "es" => Ok(LanguageCode::Spanish),
            "fr" => Ok(LanguageCode::French),
            "de" => Ok(LanguageCode::German),
            "it" => Ok(LanguageCode::Italian),
            "pt" => Ok(LanguageCode::Portuguese),
            other => Err(format!("unsupported language code: {}", other)),
        }
    }
}

/// Language setting for a batch: a fixed code or per-slide detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSetting {
    Fixed(LanguageCode),
    Auto,
}

impl LanguageSetting {
    /// Resolve the language for one piece of narration text
    pub fn resolve(&self, text: &str) -> LanguageCode {
        match self {
            LanguageSetting::Fixed(code) => *code,
            LanguageSetting::Auto => detect_language(text),
        }
    }
}

impl FromStr for LanguageSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(LanguageSetting::Auto)
        } else {
            s.parse().map(LanguageSetting::Fixed)
        }
    }
}

/// Detect the language of the given text
/// Returns LanguageCode or defaults to English
pub fn detect_language(text: &str) -> LanguageCode {
    let languages = vec![
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
    ];

    let detector = LanguageDetectorBuilder::from_languages(&languages).build();

    if let Some(language) = detector.detect_language_of(text) {
        LanguageCode::from_lingua(language)
    } else {
        LanguageCode::English
    }
}

/// Default AWS Polly neural voice for a language
pub fn polly_voice_for_language(language: LanguageCode) -> &'static str {
    match language {
        LanguageCode::English => "Matthew",
        LanguageCode::Spanish => "Lupe",
        LanguageCode::French => "Lea",
        LanguageCode::German => "Vicki",
        LanguageCode::Italian => "Bianca",
        LanguageCode::Portuguese => "Ines",
    }
}

/// Default OpenAI voice for a language
pub fn openai_voice_for_language(language: LanguageCode) -> &'static str {
    match language {
        LanguageCode::English => "onyx",
        LanguageCode::Spanish => "echo",
        LanguageCode::French => "nova",
        LanguageCode::German => "onyx",
        LanguageCode::Italian => "fable",
        LanguageCode::Portuguese => "shimmer",
    }
}
