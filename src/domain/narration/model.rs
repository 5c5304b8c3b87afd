use super::error::NarrationError;
use crate::domain::tts::VoiceConfig;
use std::path::{Path, PathBuf};

/// One slide of narration to synthesize. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationRequest {
    lesson_id: u32,
    slide_id: u32,
    text: String,
    voice: VoiceConfig,
}

impl NarrationRequest {
    pub fn new(lesson_id: u32, slide_id: u32, text: impl Into<String>, voice: VoiceConfig) -> Self {
        Self {
            lesson_id,
            slide_id,
            text: text.into(),
            voice,
        }
    }

    pub fn lesson_id(&self) -> u32 {
        self.lesson_id
    }

    pub fn slide_id(&self) -> u32 {
        self.slide_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &VoiceConfig {
        &self.voice
    }

    /// Short label used in progress lines, e.g. `lesson5/slide3`
    pub fn label(&self) -> String {
        format!("lesson{}/slide{}", self.lesson_id, self.slide_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NarrationStatus {
    Success { bytes_written: u64, attempts: u32 },
    Failed(NarrationError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NarrationResult {
    pub request: NarrationRequest,
    pub output_path: PathBuf,
    pub status: NarrationStatus,
}

impl NarrationResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, NarrationStatus::Success { .. })
    }

    pub fn error(&self) -> Option<&NarrationError> {
        match &self.status {
            NarrationStatus::Failed(err) => Some(err),
            NarrationStatus::Success { .. } => None,
        }
    }
}

/// Deterministic location of a slide's audio:
/// `{base}/lesson{lesson_id}/slide{slide_id}.{ext}`.
///
/// Requests sharing a lesson and slide map to the same file; the later
/// write wins.
pub fn output_path(base: &Path, lesson_id: u32, slide_id: u32, extension: &str) -> PathBuf {
    lesson_dir(base, lesson_id).join(format!("slide{}.{}", slide_id, extension))
}

pub fn lesson_dir(base: &Path, lesson_id: u32) -> PathBuf {
    base.join(format!("lesson{}", lesson_id))
}

/// Counts reported at the end of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[NarrationResult]) -> Self {
        Self {
            attempted: results.len(),
            succeeded: results.iter().filter(|r| r.is_success()).count(),
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.attempted as f64 * 100.0
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} attempted, {} succeeded", self.attempted, self.succeeded)
    }
}
