use crate::domain::narration::NarrationRequest;
use crate::domain::tts::{clean_text, LanguageSetting, SpeechRate, VoiceConfig};
use crate::infrastructure::config::{Config, TtsProvider};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct LessonCatalog {
    pub lessons: Vec<Lesson>,
}

/// A lesson as stored in the data file. `voices`, `rate` and `language`
/// override the configured defaults for every slide of the lesson.
///
/// Voice ids only mean something to one provider, so `voices` is keyed by
/// provider name (`"polly": "Matthew"`). Providers without an entry use
/// the configured voice or their own default.
#[derive(Debug, Clone, Deserialize)]
pub struct Lesson {
    pub id: u32,
    #[serde(default)]
    pub voices: BTreeMap<String, String>,
    #[serde(default)]
    pub rate: Option<SpeechRate>,
    #[serde(default)]
    pub language: Option<String>,
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slide {
    pub id: u32,
    pub text: String,
}

/// Voice settings applied to slides whose lesson does not override them
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceDefaults {
    pub provider: TtsProvider,
    pub voice: Option<String>,
    pub language: LanguageSetting,
    pub rate: SpeechRate,
    pub slow: bool,
}

impl From<&Config> for VoiceDefaults {
    fn from(config: &Config) -> Self {
        Self {
            provider: config.provider,
            voice: config.voice.clone(),
            language: config.language,
            rate: config.rate,
            slow: config.slow,
        }
    }
}

pub struct LessonRepository {
    path: PathBuf,
}

impl LessonRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the lesson file, keeping only `lesson_ids` when given.
    /// File order is preserved.
    pub async fn load(&self, lesson_ids: Option<&[u32]>) -> anyhow::Result<Vec<Lesson>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let catalog: LessonCatalog = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;

        let lessons = match lesson_ids {
            None => catalog.lessons,
            Some(ids) => {
                if let Some(missing) = ids
                    .iter()
                    .find(|id| !catalog.lessons.iter().any(|l| l.id == **id))
                {
                    bail!("lesson {} not found in {}", missing, self.path.display());
                }
                catalog
                    .lessons
                    .into_iter()
                    .filter(|lesson| ids.contains(&lesson.id))
                    .collect()
            }
        };

        tracing::info!(
            path = %self.path.display(),
            lessons = lessons.len(),
            slides = lessons.iter().map(|l| l.slides.len()).sum::<usize>(),
            "Lesson data loaded"
        );

        Ok(lessons)
    }
}

/// Flatten lessons into narration requests, one per slide, in file order
pub fn into_requests(
    lessons: Vec<Lesson>,
    defaults: &VoiceDefaults,
) -> anyhow::Result<Vec<NarrationRequest>> {
    let mut requests = Vec::new();

    for lesson in lessons {
        let language = match &lesson.language {
            Some(raw) => raw
                .parse::<LanguageSetting>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("invalid language for lesson {}", lesson.id))?,
            None => defaults.language,
        };
        let voice = lesson
            .voices
            .get(defaults.provider.as_str())
            .cloned()
            .or_else(|| defaults.voice.clone());
        let rate = lesson.rate.unwrap_or(defaults.rate);

        for slide in lesson.slides {
            let voice_config = VoiceConfig {
                voice: voice.clone(),
                language: language.resolve(&clean_text(&slide.text)),
                rate,
                slow: defaults.slow,
            };
            requests.push(NarrationRequest::new(
                lesson.id,
                slide.id,
                slide.text,
                voice_config,
            ));
        }
    }

    Ok(requests)
}

/// Requests built from the bundled lesson file for `provider`, with English
/// as the default language
#[cfg(test)]
pub(crate) fn bundled_requests(provider: TtsProvider) -> Vec<NarrationRequest> {
    let catalog: LessonCatalog =
        serde_json::from_str(include_str!("../../../data/lessons.json")).unwrap();
    let defaults = VoiceDefaults {
        provider,
        voice: None,
        language: LanguageSetting::Fixed(crate::domain::tts::LanguageCode::English),
        rate: SpeechRate::default(),
        slow: false,
    };
    into_requests(catalog.lessons, &defaults).unwrap()
}
