pub mod elevenlabs_tts_repository;
pub mod google_tts_repository;
pub mod lesson_repository;
pub mod manifest_repository;
pub mod openai_tts_repository;
pub mod polly_tts_repository;
pub mod tts_repository;

pub use elevenlabs_tts_repository::ElevenLabsTtsRepository;
pub use google_tts_repository::GoogleTtsRepository;
pub use lesson_repository::{into_requests, Lesson, LessonRepository, Slide, VoiceDefaults};
pub use manifest_repository::{Manifest, ManifestRepository};
pub use openai_tts_repository::OpenAiTtsRepository;
pub use polly_tts_repository::PollyTtsRepository;
pub use tts_repository::{AudioStream, SynthesizedAudio, TtsError, TtsRepository};
