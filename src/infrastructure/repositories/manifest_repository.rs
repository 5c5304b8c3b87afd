use crate::domain::narration::{BatchSummary, NarrationResult, NarrationStatus};
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

/// JSON report of one batch run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub provider: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Percentage, one decimal
    pub success_rate: f64,
    pub items: Vec<ManifestItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestItem {
    pub lesson: u32,
    pub slide: u32,
    /// Relative to the output root
    pub path: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Manifest {
    pub fn from_results(provider: &str, output_root: &Path, results: &[NarrationResult]) -> Self {
        let summary = BatchSummary::from_results(results);

        let items = results
            .iter()
            .map(|result| {
                let path = result
                    .output_path
                    .strip_prefix(output_root)
                    .unwrap_or(&result.output_path)
                    .to_string_lossy()
                    .into_owned();

                let mut item = ManifestItem {
                    lesson: result.request.lesson_id(),
                    slide: result.request.slide_id(),
                    path,
                    status: ItemStatus::Success,
                    bytes: None,
                    attempts: None,
                    error_kind: None,
                    error: None,
                };

                match &result.status {
                    NarrationStatus::Success {
                        bytes_written,
                        attempts,
                    } => {
                        item.bytes = Some(*bytes_written);
                        item.attempts = Some(*attempts);
                    }
                    NarrationStatus::Failed(err) => {
                        item.status = ItemStatus::Failed;
                        item.error_kind = Some(err.kind().to_string());
                        item.error = Some(err.to_string());
                    }
                }
                item
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            provider: provider.to_string(),
            attempted: summary.attempted,
            succeeded: summary.succeeded,
            failed: summary.failed(),
            success_rate: (summary.success_rate() * 10.0).round() / 10.0,
            items,
        }
    }
}

pub struct ManifestRepository {
    output_root: PathBuf,
}

impl ManifestRepository {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_root.join(MANIFEST_FILE)
    }

    /// Write the manifest, replacing the one from a previous run
    pub async fn save(&self, manifest: &Manifest) -> AppResult<PathBuf> {
        let path = self.path();
        let json = serde_json::to_vec_pretty(manifest)?;
        tokio::fs::write(&path, json).await?;

        tracing::info!(
            path = %path.display(),
            items = manifest.items.len(),
            "Manifest written"
        );

        Ok(path)
    }
}
