//! Write-once quarantine artifacts for rejected rows.
//!
//! One artifact per failing stage per input file. Artifacts keep the original
//! field text, fully quoted, and are never read back by the pipeline.

use crate::error::PipelineError;
use crate::services::validate::QuarantineBatch;
use chrono::{DateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use std::path::{Path, PathBuf};

/// Deterministic artifact name from source file, failure category and the
/// detection timestamp.
pub fn artifact_path(dir: &Path, source_name: &str, label: &str, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "invalid_{}_{}_{}.csv",
        source_name,
        label,
        at.format("%Y%m%d_%H%M%S")
    ))
}

pub fn write_batch(
    dir: &Path,
    source_name: &str,
    batch: &QuarantineBatch,
    at: DateTime<Utc>,
) -> Result<PathBuf, PipelineError> {
    let path = artifact_path(dir, source_name, batch.reason.label(), at);
    let mut writer = WriterBuilder::new().quote_style(QuoteStyle::Always).from_path(&path)?;
    for row in &batch.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}
