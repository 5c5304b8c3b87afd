use super::error::NarrationError;
use super::model::{
    lesson_dir, output_path, BatchSummary, NarrationRequest, NarrationResult, NarrationStatus,
};
use super::retry::RetryPolicy;
use crate::domain::tts::clean_text;
use crate::error::AppError;
use crate::infrastructure::repositories::TtsRepository;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Maximum number of items synthesized at the same time
    pub concurrency: usize,
    /// Upper bound for a single synthesis attempt
    pub item_timeout: Duration,
    pub retry: RetryPolicy,
    /// Minimum spacing between item starts
    pub request_delay: Duration,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            item_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            request_delay: Duration::ZERO,
        }
    }
}

/// Batch narration generator.
///
/// Every request yields exactly one result, in input order. A failing item
/// is recorded and the batch moves on.
pub struct NarrationService {
    tts_repo: Arc<dyn TtsRepository>,
    output_root: PathBuf,
    options: GeneratorOptions,
}

impl NarrationService {
    pub fn new(
        tts_repo: Arc<dyn TtsRepository>,
        output_root: impl Into<PathBuf>,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            tts_repo,
            output_root: output_root.into(),
            options,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn provider(&self) -> &'static str {
        self.tts_repo.provider()
    }

    pub fn output_path_for(&self, request: &NarrationRequest) -> PathBuf {
        output_path(
            &self.output_root,
            request.lesson_id(),
            request.slide_id(),
            self.tts_repo.file_extension(),
        )
    }

    /// Create the output root. Nothing can be written without it, so a
    /// failure here is fatal for the whole batch.
    pub async fn prepare_output_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.output_root)
            .await
            .map_err(|source| AppError::OutputRoot {
                path: self.output_root.clone(),
                source,
            })?;

        tracing::debug!(output_root = %self.output_root.display(), "Output root ready");
        Ok(())
    }
}

#[async_trait]
pub trait NarrationServiceApi: Send + Sync {
    /// Synthesize every request and write its audio file
    ///
    /// This operation:
    /// - Validates the text of each item before any network call
    /// - Creates the lesson directory on demand
    /// - Streams the backend audio to the item's output path
    /// - Retries transient backend failures and timeouts with backoff
    ///
    /// Returns one result per request, in the order given
    async fn generate(&self, requests: Vec<NarrationRequest>) -> Vec<NarrationResult>;
}

#[async_trait]
impl NarrationServiceApi for NarrationService {
    async fn generate(&self, requests: Vec<NarrationRequest>) -> Vec<NarrationResult> {
        let total = requests.len();
        let concurrency = self.options.concurrency.max(1);
        let batch_start = Instant::now();

        tracing::info!(
            provider = self.tts_repo.provider(),
            total,
            concurrency,
            output_root = %self.output_root.display(),
            "Starting narration batch"
        );

        let results: Vec<NarrationResult> = futures::stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| self.process(index, total, batch_start, request))
            .buffered(concurrency)
            .collect()
            .await;

        let summary = BatchSummary::from_results(&results);
        tracing::info!(
            provider = self.tts_repo.provider(),
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed(),
            elapsed_secs = batch_start.elapsed().as_secs_f64(),
            "Narration batch finished: {}",
            summary
        );

        results
    }
}

impl NarrationService {
    async fn process(
        &self,
        index: usize,
        total: usize,
        batch_start: Instant,
        request: NarrationRequest,
    ) -> NarrationResult {
        let path = self.output_path_for(&request);

        if !self.options.request_delay.is_zero() {
            let slot = u32::try_from(index).unwrap_or(u32::MAX);
            tokio::time::sleep_until(batch_start + self.options.request_delay.saturating_mul(slot))
                .await;
        }

        tracing::info!(
            lesson_id = request.lesson_id(),
            slide_id = request.slide_id(),
            position = index + 1,
            total,
            "Generating {}",
            request.label()
        );

        let status = match self.narrate(index, &request, &path).await {
            Ok((bytes_written, attempts)) => {
                tracing::info!(
                    lesson_id = request.lesson_id(),
                    slide_id = request.slide_id(),
                    bytes_written,
                    attempts,
                    path = %path.display(),
                    "Saved {}",
                    request.label()
                );
                NarrationStatus::Success {
                    bytes_written,
                    attempts,
                }
            }
            Err(err) => {
                tracing::error!(
                    lesson_id = request.lesson_id(),
                    slide_id = request.slide_id(),
                    error = %err,
                    kind = err.kind(),
                    "Failed {}",
                    request.label()
                );
                NarrationStatus::Failed(err)
            }
        };

        NarrationResult {
            request,
            output_path: path,
            status,
        }
    }

    /// Returns bytes written and the number of attempts used
    async fn narrate(
        &self,
        index: usize,
        request: &NarrationRequest,
        path: &Path,
    ) -> Result<(u64, u32), NarrationError> {
        let text = clean_text(request.text());
        if text.is_empty() {
            return Err(NarrationError::Validation(
                "narration text is empty".to_string(),
            ));
        }

        let dir = lesson_dir(&self.output_root, request.lesson_id());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| NarrationError::filesystem(&dir, e))?;

        let partial = partial_path(path, index);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(
                self.options.item_timeout,
                self.synthesize_to_file(&text, request, &partial, path),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(NarrationError::Timeout(self.options.item_timeout)),
            };

            match outcome {
                Ok(bytes_written) => return Ok((bytes_written, attempt)),
                Err(err) => {
                    remove_partial(&partial).await;

                    if !err.is_retryable() || attempt > self.options.retry.max_retries {
                        return Err(err);
                    }

                    let delay = self.options.retry.delay_for(attempt);
                    tracing::warn!(
                        lesson_id = request.lesson_id(),
                        slide_id = request.slide_id(),
                        error = %err,
                        attempt,
                        max_retries = self.options.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Synthesis attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Stream the backend audio into `partial` and move it into place once complete
    async fn synthesize_to_file(
        &self,
        text: &str,
        request: &NarrationRequest,
        partial: &Path,
        path: &Path,
    ) -> Result<u64, NarrationError> {
        let audio = self
            .tts_repo
            .synthesize(text, request.voice())
            .await
            .map_err(NarrationError::from)?;

        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| NarrationError::filesystem(partial, e))?;

        let mut stream = audio.into_stream();
        let mut bytes_written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(NarrationError::from)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| NarrationError::filesystem(partial, e))?;
            bytes_written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| NarrationError::filesystem(partial, e))?;
        drop(file);

        if bytes_written == 0 {
            return Err(NarrationError::Backend(
                "backend returned no audio".to_string(),
            ));
        }

        tokio::fs::rename(partial, path)
            .await
            .map_err(|e| NarrationError::filesystem(path, e))?;

        Ok(bytes_written)
    }
}

/// Item 7 writes `slide3.mp3` as `slide3.mp3.7.part` until the stream
/// completes. The batch position keeps two requests for the same slide from
/// sharing a partial file.
fn partial_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.part", index));
    path.with_file_name(name)
}

async fn remove_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => tracing::debug!(path = %partial.display(), "Removed partial audio file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %partial.display(),
            error = %e,
            "Could not remove partial audio file"
        ),
    }
}
