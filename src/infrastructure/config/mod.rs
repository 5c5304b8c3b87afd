use crate::domain::narration::{GeneratorOptions, RetryPolicy};
use crate::domain::tts::{LanguageCode, LanguageSetting, SpeechRate};
use crate::error::AppError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub lessons_file: PathBuf,
    pub output_root: PathBuf,
    pub lesson_ids: Option<Vec<u32>>,
    pub log_format: LogFormat,
    // TTS defaults, overridable per lesson
    pub provider: TtsProvider,
    pub voice: Option<String>,
    pub language: LanguageSetting,
    pub rate: SpeechRate,
    pub slow: bool,
    // Generator
    pub concurrency: usize,
    pub item_timeout: Duration,
    pub retry: RetryPolicy,
    pub request_delay: Duration,
    pub write_manifest: bool,
    // Providers
    pub aws_region: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_model: String,
    pub elevenlabs_base_url: String,
    pub google_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    Google,
    Polly,
    OpenAi,
    ElevenLabs,
}

impl TtsProvider {
    /// Name used in logs, the manifest and per-provider lesson voices
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsProvider::Google => "google",
            TtsProvider::Polly => "polly",
            TtsProvider::OpenAi => "openai",
            TtsProvider::ElevenLabs => "elevenlabs",
        }
    }
}

impl std::fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TtsProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gtts" => Ok(TtsProvider::Google),
            "polly" | "aws" => Ok(TtsProvider::Polly),
            "openai" => Ok(TtsProvider::OpenAi),
            "elevenlabs" => Ok(TtsProvider::ElevenLabs),
            other => Err(format!("unknown TTS provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            lessons_file: PathBuf::from(or("NARRATION_LESSONS_FILE", "data/lessons.json")),
            output_root: PathBuf::from(or("NARRATION_OUTPUT_ROOT", "public/audio")),
            lesson_ids: var("NARRATION_LESSON_IDS")
                .map(|raw| parse_id_list(&raw))
                .transpose()?,
            log_format: match or("LOG_FORMAT", "pretty").to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            provider: parse("TTS_PROVIDER", &or("TTS_PROVIDER", "google"))?,
            voice: var("TTS_VOICE"),
            language: parse("TTS_LANGUAGE", &or("TTS_LANGUAGE", "en"))?,
            rate: parse("TTS_RATE", &or("TTS_RATE", "+0%"))?,
            slow: parse_bool(&or("TTS_SLOW", "false")),
            concurrency: parse("NARRATION_CONCURRENCY", &or("NARRATION_CONCURRENCY", "1"))?,
            item_timeout: Duration::from_secs(parse(
                "NARRATION_ITEM_TIMEOUT_SECS",
                &or("NARRATION_ITEM_TIMEOUT_SECS", "120"),
            )?),
            retry: RetryPolicy {
                max_retries: parse("NARRATION_MAX_RETRIES", &or("NARRATION_MAX_RETRIES", "2"))?,
                initial_delay: Duration::from_millis(parse(
                    "NARRATION_RETRY_DELAY_MS",
                    &or("NARRATION_RETRY_DELAY_MS", "1000"),
                )?),
                max_delay: Duration::from_millis(parse(
                    "NARRATION_RETRY_MAX_DELAY_MS",
                    &or("NARRATION_RETRY_MAX_DELAY_MS", "10000"),
                )?),
            },
            request_delay: Duration::from_millis(parse(
                "NARRATION_REQUEST_DELAY_MS",
                &or("NARRATION_REQUEST_DELAY_MS", "0"),
            )?),
            write_manifest: parse_bool(&or("NARRATION_WRITE_MANIFEST", "true")),
            aws_region: or("AWS_REGION", "eu-west-1"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: or("OPENAI_TTS_MODEL", "tts-1"),
            elevenlabs_api_key: var("ELEVENLABS_API_KEY"),
            elevenlabs_model: or("ELEVENLABS_MODEL", "eleven_multilingual_v2"),
            elevenlabs_base_url: or("ELEVENLABS_BASE_URL", "https://api.elevenlabs.io"),
            google_base_url: or("GOOGLE_TTS_BASE_URL", "https://translate.google.com"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 {
            return Err(AppError::Config(
                "NARRATION_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        if self.item_timeout.is_zero() {
            return Err(AppError::Config(
                "NARRATION_ITEM_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        self.retry.validate().map_err(AppError::Config)?;

        if self.provider == TtsProvider::ElevenLabs && self.elevenlabs_api_key.is_none() {
            return Err(AppError::Config(
                "ELEVENLABS_API_KEY is required for the elevenlabs provider".to_string(),
            ));
        }

        if self.provider == TtsProvider::OpenAi && self.openai_api_key.is_none() {
            return Err(AppError::Config(
                "OPENAI_API_KEY is required for the openai provider".to_string(),
            ));
        }

        Ok(())
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            concurrency: self.concurrency,
            item_timeout: self.item_timeout,
            retry: self.retry,
            request_delay: self.request_delay,
        }
    }

    /// Language used when a lesson does not set one and detection is off
    pub fn default_language(&self) -> LanguageCode {
        match self.language {
            LanguageSetting::Fixed(code) => code,
            LanguageSetting::Auto => LanguageCode::default(),
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e)))
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_id_list(raw: &str) -> Result<Vec<u32>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| parse::<u32>("NARRATION_LESSON_IDS", id))
        .collect()
}
