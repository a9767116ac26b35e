//! Per-file orchestration: validate, register, write, commit, dispose.
//!
//! One file is processed end to end inside a single unit of work; the
//! transaction closure spans id resolution and both bulk inserts, so a
//! failure anywhere leaves no partial raw-without-aggregate state behind.
//! Quarantine artifacts are the exception: they are written as soon as
//! validation rejects rows and stay in place even when the file later fails.

use crate::config::Config;
use crate::db::models::NewSensorReading;
use crate::error::PipelineError;
use crate::services::{aggregate, quarantine, registry, retry, validate, writer};
use chrono::Utc;
use diesel::PgConnection;
use diesel::prelude::*;
use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::Path;

/// How far a file's processing got, named in failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Registered,
    Written,
    Committed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Registered => "registered",
            Stage::Written => "written",
            Stage::Committed => "committed",
        }
    }
}

#[derive(Debug)]
pub struct IngestSummary {
    pub clean_rows: usize,
    pub dropped_rows: usize,
    pub inserted_raw: usize,
    pub inserted_agg: usize,
}

/// Process one drop file to a terminal outcome. Fatal conditions are caught
/// here: the error is logged with the stage reached and the file moves to the
/// failure area. This function never propagates a per-file failure.
pub fn process_file(conn: &mut PgConnection, cfg: &Config, path: &Path) {
    info!("Processing file: {}", path.display());
    let mut stage = Stage::Received;
    match ingest_file(conn, cfg, path, &mut stage) {
        Ok(summary) => {
            info!(
                "Committed {}: {} raw and {} aggregate row(s) inserted ({} duplicate(s) skipped, {} quarantined)",
                path.display(),
                summary.inserted_raw,
                summary.inserted_agg,
                summary.clean_rows - summary.inserted_raw,
                summary.dropped_rows
            );
            match fs::remove_file(path) {
                Ok(()) => info!("Removed processed file: {}", path.display()),
                Err(e) => warn!("Could not remove processed file {}: {}", path.display(), e),
            }
        }
        Err(e) => {
            error!("Failed to process {} (stage: {}): {}", path.display(), stage.as_str(), e);
            relocate_failed(path, &cfg.failed_dir);
        }
    }
}

fn ingest_file(
    conn: &mut PgConnection,
    cfg: &Config,
    path: &Path,
    stage: &mut Stage,
) -> Result<IngestSummary, PipelineError> {
    let file_name = match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => {
            return Err(PipelineError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path has no file name",
            )));
        }
    };

    let rows = validate::load_rows(path)?;
    let total_rows = rows.len();
    let filtered = validate::filter_rows(rows);

    // Quarantine side effects happen now and are not undone by a later
    // failure of the same file.
    let detected_at = Utc::now();
    for batch in &filtered.batches {
        let dest = quarantine::write_batch(&cfg.quarantine_dir, &file_name, batch, detected_at)?;
        warn!(
            "Quarantined {} row(s) from {} ({}) to {}",
            batch.rows.len(),
            file_name,
            batch.reason.label(),
            dest.display()
        );
    }

    let clean = validate::normalize(filtered.survivors)?;
    *stage = Stage::Validated;
    info!(
        "Validated {} of {} row(s) for {} (dropped {})",
        clean.len(),
        total_rows,
        file_name,
        filtered.dropped
    );

    let summary = conn.transaction::<IngestSummary, PipelineError, _>(|conn| {
        let file_id = retry::with_retries(&cfg.retry, || registry::resolve_file_id(conn, &file_name))?;
        *stage = Stage::Registered;

        let ingested_at = Utc::now();
        let raw_rows: Vec<NewSensorReading> = clean
            .iter()
            .map(|r| NewSensorReading {
                ts: r.ts,
                device: r.device.clone(),
                temp: r.temp,
                humidity: r.humidity,
                co: r.co,
                lpg: r.lpg,
                smoke: r.smoke,
                motion: r.motion,
                light: r.light,
                file_name: file_name.clone(),
                file_id,
                ingested_at,
            })
            .collect();
        let inserted_raw = writer::insert_raw_readings(conn, &raw_rows)?;

        let metrics = aggregate::aggregate(&clean, file_id, Utc::now());
        let inserted_agg = writer::insert_aggregates(conn, &metrics)?;
        *stage = Stage::Written;

        Ok(IngestSummary {
            clean_rows: clean.len(),
            dropped_rows: filtered.dropped,
            inserted_raw,
            inserted_agg,
        })
    })?;
    *stage = Stage::Committed;

    Ok(summary)
}

/// Move the unmodified source file into the failure area under its own name.
/// A name collision overwrites the previous failure artifact.
fn relocate_failed(path: &Path, failed_dir: &Path) {
    let Some(name) = path.file_name() else {
        error!("Cannot relocate {}: no file name", path.display());
        return;
    };
    let dest = failed_dir.join(name);
    match fs::rename(path, &dest) {
        Ok(()) => info!("Relocated {} to {}", path.display(), dest.display()),
        Err(e) => error!("Could not relocate {} to failure area: {}", path.display(), e),
    }
}
