use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use lesson_narrator::domain::tts::VoiceConfig;
use lesson_narrator::infrastructure::repositories::{SynthesizedAudio, TtsError, TtsRepository};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted TTS repository.
///
/// By default every call succeeds with `audio:{text}` as the payload, so a
/// test can tell from a file's content which text produced it.
#[derive(Default)]
pub struct MockTtsRepository {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    received: Mutex<Vec<String>>,
    fail_marker: Option<String>,
    fail_first: usize,
    known_voices: Option<Vec<String>>,
    chunks: Option<Vec<Vec<u8>>>,
    break_stream_after: Option<usize>,
    delay: Option<Duration>,
    slow_marker: Option<(String, Duration)>,
}

impl MockTtsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call whose text contains `marker`
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    /// Fail the first `count` calls, whatever their text
    pub fn failing_first_calls(mut self, count: usize) -> Self {
        self.fail_first = count;
        self
    }

    /// Reject every request whose voice is not one of `voices`, the way a
    /// provider answers an unknown voice id
    pub fn with_voices(mut self, voices: &[&str]) -> Self {
        self.known_voices = Some(voices.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Answer with these chunks as a stream instead of a complete payload
    pub fn streaming(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Yield `count` chunks, then an error
    pub fn breaking_stream_after(mut self, count: usize) -> Self {
        self.break_stream_after = Some(count);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only calls whose text contains `marker`
    pub fn slow_on(mut self, marker: &str, delay: Duration) -> Self {
        self.slow_marker = Some((marker.to_string(), delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Texts received by the repository, in call order
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    async fn respond(
        &self,
        call: usize,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesizedAudio, TtsError> {
        let delay = match &self.slow_marker {
            Some((marker, delay)) if text.contains(marker.as_str()) => Some(*delay),
            _ => self.delay,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(known) = &self.known_voices {
            let requested = voice.voice.as_deref().unwrap_or("default");
            if !known.iter().any(|v| v == requested) {
                return Err(TtsError::from_status(
                    400,
                    format!("HTTP 400 from mock: unknown voice {}", requested),
                ));
            }
        }
        if call < self.fail_first {
            return Err(TtsError::Transient(format!("transient failure on call {}", call + 1)));
        }
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(TtsError::from_status(500, "HTTP 500 from mock"));
            }
        }

        match &self.chunks {
            None => Ok(SynthesizedAudio::Complete(format!("audio:{}", text).into_bytes())),
            Some(chunks) => {
                let mut items: Vec<Result<Vec<u8>, TtsError>> =
                    chunks.iter().cloned().map(Ok).collect();
                if let Some(count) = self.break_stream_after {
                    items.truncate(count);
                    items.push(Err(TtsError::Transient("connection reset mid-stream".to_string())));
                }
                Ok(SynthesizedAudio::Stream(stream::iter(items).boxed()))
            }
        }
    }
}

#[async_trait]
impl TtsRepository for MockTtsRepository {
    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesizedAudio, TtsError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(text.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = self.respond(call, text, voice).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
