//! Idempotent file-name registration.

use crate::db::models::{FileRecord, NewFileRecord};
use crate::error::PipelineError;
use crate::schema;
use diesel::PgConnection;
use diesel::prelude::*;
use log::info;

/// Resolve the durable storage id for a file name.
///
/// The insert is a no-op when the name is already registered, so concurrent
/// callers racing on one name create at most one row and all observe the same
/// id. Yielding no id from either path means the store is inconsistent and
/// the file cannot be processed.
pub fn resolve_file_id(conn: &mut PgConnection, file_name: &str) -> Result<i64, PipelineError> {
    use schema::files::dsl as F;

    let new_row = NewFileRecord {
        file_name: file_name.to_string(),
    };
    let inserted: Option<i64> = diesel::insert_into(F::files)
        .values(&new_row)
        .on_conflict(F::file_name)
        .do_nothing()
        .returning(F::id)
        .get_result(conn)
        .optional()?;
    if let Some(id) = inserted {
        return Ok(id);
    }

    info!("File {} already registered, fetching existing id", file_name);
    let existing: Option<FileRecord> = F::files
        .filter(F::file_name.eq(file_name))
        .select(FileRecord::as_select())
        .first(conn)
        .optional()?;
    match existing {
        Some(record) => Ok(record.id),
        None => Err(PipelineError::MissingFileId(file_name.to_string())),
    }
}
