//! Drop-directory trigger: startup sweep plus a steady polling loop.
//!
//! Processing disposes of every file it touches (delete on success, relocate
//! on failure), so any `.csv` present in the drop directory at a tick is new
//! work. One file is processed fully before the next; arrivals during a tick
//! are picked up on the following one.

use crate::config::Config;
use crate::services::pipeline;
use diesel::PgConnection;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

/// Batch files currently in the drop directory, in name order so processing
/// order is deterministic.
fn pending_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Process every batch file already present at startup.
pub fn scan_existing(conn: &mut PgConnection, cfg: &Config) -> Result<usize, String> {
    let files = pending_files(&cfg.data_dir)
        .map_err(|e| format!("scanning {} failed: {}", cfg.data_dir.display(), e))?;
    for path in &files {
        pipeline::process_file(conn, cfg, path);
    }
    Ok(files.len())
}

/// Poll the drop directory until the process is interrupted.
pub fn run_loop(conn: &mut PgConnection, cfg: &Config) -> Result<(), String> {
    loop {
        let tick_start = Instant::now();

        let files = pending_files(&cfg.data_dir)
            .map_err(|e| format!("scanning {} failed: {}", cfg.data_dir.display(), e))?;
        if !files.is_empty() {
            debug!("Found {} new file(s) in {}", files.len(), cfg.data_dir.display());
        }
        for path in &files {
            pipeline::process_file(conn, cfg, path);
        }

        // Maintain steady cadence
        let elapsed = tick_start.elapsed();
        if elapsed < cfg.poll_interval {
            thread::sleep(cfg.poll_interval - elapsed);
        }
    }
}
