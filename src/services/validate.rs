//! Three-stage row validation for sensor batch files.
//!
//! Stages run in order over a shrinking row set, so a row is quarantined by
//! at most one stage: missing key fields first, then non-numeric
//! temperatures, then temperatures outside the accepted range. Filtering
//! never fails; the caller writes the quarantine batches out before
//! normalizing the survivors, because a timestamp or flag that fails to
//! parse during normalization is fatal for the whole file and must not undo
//! quarantining that already happened.

use crate::error::PipelineError;
use crate::models::reading::{CleanReading, COLUMNS, CsvRow, cell};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, Trim};
use std::path::Path;

pub const TEMP_MIN_C: f64 = -50.0;
pub const TEMP_MAX_C: f64 = 50.0;

/// Which stage rejected a batch of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineReason {
    /// ts, device or temp missing.
    NullKey,
    /// temp present but not numeric.
    TypeFailure,
    /// temp numeric but outside `[TEMP_MIN_C, TEMP_MAX_C]`.
    RangeFailure,
}

impl QuarantineReason {
    pub fn label(self) -> &'static str {
        match self {
            QuarantineReason::NullKey => "null",
            QuarantineReason::TypeFailure => "type",
            QuarantineReason::RangeFailure => "range",
        }
    }
}

/// Rows rejected by one stage, in input order, with their original text.
#[derive(Debug)]
pub struct QuarantineBatch {
    pub reason: QuarantineReason,
    pub rows: Vec<CsvRow>,
}

/// Outcome of the filter stages. `survivors` still need [`normalize`].
#[derive(Debug)]
pub struct Filtered {
    pub survivors: Vec<Survivor>,
    pub batches: Vec<QuarantineBatch>,
    pub dropped: usize,
}

/// A row that passed every filter stage, with its key fields already
/// extracted and the temperature parsed.
#[derive(Debug)]
pub struct Survivor {
    raw: CsvRow,
    ts: String,
    device: String,
    temp: f64,
}

// Stage-one output: key fields present but temperature still text.
struct KeyedRow {
    raw: CsvRow,
    ts: String,
    device: String,
    temp: String,
}

/// Read all records of a drop file. The header must carry every expected
/// column; anything else means the file is structurally unreadable.
pub fn load_rows(path: &Path) -> Result<Vec<CsvRow>, PipelineError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Run the three filter stages. Every input row ends up either as a survivor
/// or in exactly one quarantine batch.
pub fn filter_rows(rows: Vec<CsvRow>) -> Filtered {
    let total = rows.len();
    let mut batches = Vec::new();

    let (keyed, nulls) = drop_null_keys(rows);
    push_batch(&mut batches, QuarantineReason::NullKey, nulls);

    let (typed, non_numeric) = drop_non_numeric(keyed);
    push_batch(&mut batches, QuarantineReason::TypeFailure, non_numeric);

    let (survivors, out_of_range) = drop_out_of_range(typed);
    push_batch(&mut batches, QuarantineReason::RangeFailure, out_of_range);

    let dropped: usize = batches.iter().map(|b| b.rows.len()).sum();
    debug_assert_eq!(dropped, total - survivors.len());

    Filtered { survivors, batches, dropped }
}

/// Normalize filtered rows for storage: timestamps to UTC instants, flags to
/// booleans, remaining measurements to floats. Any failure here aborts the
/// whole file.
pub fn normalize(survivors: Vec<Survivor>) -> Result<Vec<CleanReading>, PipelineError> {
    let mut clean = Vec::with_capacity(survivors.len());
    for row in survivors {
        let ts = parse_timestamp(&row.ts)?;
        clean.push(CleanReading {
            ts,
            device: row.device,
            temp: row.temp,
            humidity: parse_measurement("humidity", &row.raw.humidity)?,
            co: parse_measurement("co", &row.raw.co)?,
            lpg: parse_measurement("lpg", &row.raw.lpg)?,
            smoke: parse_measurement("smoke", &row.raw.smoke)?,
            motion: parse_flag("motion", &row.raw.motion)?,
            light: parse_flag("light", &row.raw.light)?,
        });
    }
    Ok(clean)
}

fn push_batch(batches: &mut Vec<QuarantineBatch>, reason: QuarantineReason, rows: Vec<CsvRow>) {
    if !rows.is_empty() {
        batches.push(QuarantineBatch { reason, rows });
    }
}

fn drop_null_keys(rows: Vec<CsvRow>) -> (Vec<KeyedRow>, Vec<CsvRow>) {
    let mut keyed = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();
    for row in rows {
        match (cell(&row.ts), cell(&row.device), cell(&row.temp)) {
            (Some(ts), Some(device), Some(temp)) => {
                let (ts, device, temp) = (ts.to_string(), device.to_string(), temp.to_string());
                keyed.push(KeyedRow { raw: row, ts, device, temp });
            }
            _ => rejected.push(row),
        }
    }
    (keyed, rejected)
}

fn drop_non_numeric(rows: Vec<KeyedRow>) -> (Vec<Survivor>, Vec<CsvRow>) {
    let mut typed = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();
    for row in rows {
        // NaN parses but carries no measurement; treat it as a type failure.
        match row.temp.parse::<f64>().ok().filter(|t| !t.is_nan()) {
            Some(temp) => typed.push(Survivor {
                raw: row.raw,
                ts: row.ts,
                device: row.device,
                temp,
            }),
            None => rejected.push(row.raw),
        }
    }
    (typed, rejected)
}

fn drop_out_of_range(rows: Vec<Survivor>) -> (Vec<Survivor>, Vec<CsvRow>) {
    let mut in_range = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();
    for row in rows {
        if (TEMP_MIN_C..=TEMP_MAX_C).contains(&row.temp) {
            in_range.push(row);
        } else {
            rejected.push(row.raw);
        }
    }
    (in_range, rejected)
}

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y/%m/%d %H:%M:%S%.f"];

/// Accept RFC 3339 or a handful of naive formats; naive timestamps are taken
/// as UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PipelineError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(PipelineError::Timestamp { value: value.to_string() })
}

fn parse_measurement(column: &'static str, field: &Option<String>) -> Result<Option<f64>, PipelineError> {
    match cell(field) {
        Some(s) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|_| PipelineError::Number { column, value: s.to_string() }),
        None => Ok(None),
    }
}

fn parse_flag(column: &'static str, field: &Option<String>) -> Result<Option<bool>, PipelineError> {
    let Some(s) = cell(field) else { return Ok(None) };
    if s.eq_ignore_ascii_case("true") || s == "1" {
        Ok(Some(true))
    } else if s.eq_ignore_ascii_case("false") || s == "0" {
        Ok(Some(false))
    } else {
        Err(PipelineError::Flag { column, value: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn row(ts: Option<&str>, device: Option<&str>, temp: Option<&str>) -> CsvRow {
        CsvRow {
            ts: ts.map(str::to_string),
            device: device.map(str::to_string),
            temp: temp.map(str::to_string),
            humidity: None,
            co: None,
            lpg: None,
            smoke: None,
            motion: None,
            light: None,
        }
    }

    fn validate(rows: Vec<CsvRow>) -> Result<(Vec<CleanReading>, Filtered), PipelineError> {
        let mut filtered = filter_rows(rows);
        let clean = normalize(std::mem::take(&mut filtered.survivors))?;
        Ok((clean, filtered))
    }

    const TS: &str = "2020-07-12 00:01:34";

    #[test]
    fn rows_missing_key_fields_go_to_the_null_batch() {
        // 10 rows, 2 without a device.
        let mut rows: Vec<CsvRow> = (0..8)
            .map(|i| row(Some(TS), Some(format!("dev-{}", i).as_str()), Some("21.0")))
            .collect();
        rows.push(row(Some(TS), None, Some("22.0")));
        rows.push(row(Some(TS), Some(""), Some("23.0")));

        let (clean, filtered) = validate(rows).unwrap();
        assert_eq!(clean.len(), 8);
        assert_eq!(filtered.dropped, 2);
        assert_eq!(filtered.batches.len(), 1);
        assert_eq!(filtered.batches[0].reason, QuarantineReason::NullKey);
        assert_eq!(filtered.batches[0].rows.len(), 2);
    }

    #[test]
    fn non_numeric_temperatures_go_to_the_type_batch() {
        let rows = vec![
            row(Some(TS), Some("a"), Some("21.0")),
            row(Some(TS), Some("b"), Some("warm")),
            row(Some(TS), Some("c"), Some("nan")),
        ];
        let (clean, filtered) = validate(rows).unwrap();
        assert_eq!(clean.len(), 1);
        assert_eq!(filtered.batches.len(), 1);
        assert_eq!(filtered.batches[0].reason, QuarantineReason::TypeFailure);
        // Original text is preserved for the quarantine artifact.
        assert_eq!(filtered.batches[0].rows[0].temp.as_deref(), Some("warm"));
        assert_eq!(filtered.batches[0].rows[1].temp.as_deref(), Some("nan"));
    }

    #[test]
    fn out_of_range_temperatures_go_to_the_range_batch() {
        let temps = ["-60", "10", "20", "30", "200"];
        let rows: Vec<CsvRow> = temps
            .iter()
            .enumerate()
            .map(|(i, &t)| row(Some(TS), Some(format!("dev-{}", i).as_str()), Some(t)))
            .collect();

        let (clean, filtered) = validate(rows).unwrap();
        assert_eq!(clean.len(), 3);
        assert_eq!(filtered.dropped, 2);
        assert_eq!(filtered.batches.len(), 1);
        assert_eq!(filtered.batches[0].reason, QuarantineReason::RangeFailure);
        let quarantined: Vec<_> = filtered.batches[0]
            .rows
            .iter()
            .map(|r| r.temp.as_deref().unwrap())
            .collect();
        assert_eq!(quarantined, vec!["-60", "200"]);
    }

    #[test]
    fn boundary_temperatures_are_kept() {
        let rows = vec![
            row(Some(TS), Some("a"), Some("-50")),
            row(Some(TS), Some("b"), Some("50")),
        ];
        let (clean, filtered) = validate(rows).unwrap();
        assert_eq!(clean.len(), 2);
        assert!(filtered.batches.is_empty());
    }

    #[test]
    fn every_row_lands_in_exactly_one_place() {
        let rows = vec![
            row(None, Some("a"), Some("21.0")),
            row(Some(TS), Some("b"), Some("bogus")),
            row(Some(TS), Some("c"), Some("99")),
            row(Some(TS), Some("d"), Some("19.5")),
        ];
        let total = rows.len();

        let (clean, filtered) = validate(rows).unwrap();
        let batched: usize = filtered.batches.iter().map(|b| b.rows.len()).sum();
        assert_eq!(clean.len() + batched, total);
        assert_eq!(filtered.dropped, batched);
        assert_eq!(filtered.batches.len(), 3);
        // One batch per stage, in stage order.
        assert_eq!(filtered.batches[0].reason, QuarantineReason::NullKey);
        assert_eq!(filtered.batches[1].reason, QuarantineReason::TypeFailure);
        assert_eq!(filtered.batches[2].reason, QuarantineReason::RangeFailure);
    }

    #[test]
    fn unparseable_timestamp_is_fatal_for_the_file() {
        let rows = vec![row(Some("not-a-date"), Some("a"), Some("21.0"))];
        match validate(rows) {
            Err(PipelineError::Timestamp { value }) => assert_eq!(value, "not-a-date"),
            other => panic!("expected timestamp error, got {:?}", other.map(|(clean, _)| clean)),
        }
    }

    #[test]
    fn filtering_still_quarantines_when_a_survivor_is_fatal() {
        // The null batch must exist even though the surviving row will later
        // fail timestamp normalization.
        let rows = vec![
            row(None, Some("a"), Some("21.0")),
            row(Some("not-a-date"), Some("b"), Some("22.0")),
        ];
        let filtered = filter_rows(rows);
        assert_eq!(filtered.batches.len(), 1);
        assert_eq!(filtered.batches[0].reason, QuarantineReason::NullKey);
        assert!(normalize(filtered.survivors).is_err());
    }

    #[test]
    fn unparseable_flag_is_fatal_for_the_file() {
        let mut bad = row(Some(TS), Some("a"), Some("21.0"));
        bad.motion = Some("maybe".to_string());
        match validate(vec![bad]) {
            Err(PipelineError::Flag { column, value }) => {
                assert_eq!(column, "motion");
                assert_eq!(value, "maybe");
            }
            other => panic!("expected flag error, got {:?}", other.map(|(clean, _)| clean)),
        }
    }

    #[test]
    fn unparseable_measurement_is_fatal_for_the_file() {
        let mut bad = row(Some(TS), Some("a"), Some("21.0"));
        bad.humidity = Some("damp".to_string());
        assert!(matches!(
            validate(vec![bad]),
            Err(PipelineError::Number { column: "humidity", .. })
        ));
    }

    #[test]
    fn blank_optional_fields_become_null() {
        let mut r = row(Some(TS), Some("a"), Some("21.0"));
        r.humidity = Some(String::new());
        r.co = Some("NaN".to_string());
        r.smoke = Some("0.02".to_string());
        r.motion = Some("true".to_string());
        r.light = Some("0".to_string());

        let (clean, _) = validate(vec![r]).unwrap();
        assert_eq!(clean[0].humidity, None);
        assert_eq!(clean[0].co, None);
        assert_eq!(clean[0].lpg, None);
        assert_eq!(clean[0].smoke, Some(0.02));
        assert_eq!(clean[0].motion, Some(true));
        assert_eq!(clean[0].light, Some(false));
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        let rows = vec![row(Some("2020-07-12T02:00:00+02:00"), Some("a"), Some("21.0"))];
        let (clean, _) = validate(rows).unwrap();
        assert_eq!(clean[0].ts, DateTime::parse_from_rfc3339("2020-07-12T00:00:00Z").unwrap());
    }

    #[test]
    fn load_rows_requires_all_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ts,device,humidity").unwrap();
        writeln!(f, "{},dev-1,0.5", TS).unwrap();

        match load_rows(&path) {
            Err(PipelineError::MissingColumns(cols)) => {
                assert!(cols.contains(&"temp".to_string()));
                assert!(cols.contains(&"light".to_string()));
            }
            other => panic!("expected missing columns, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn load_rows_reads_quoted_blanks_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "ts,device,temp,humidity,co,lpg,smoke,motion,light").unwrap();
        writeln!(f, "\"{}\",\"dev-1\",\"22.7\",\"\",\"0.004\",\"\",\"0.02\",\"true\",\"false\"", TS).unwrap();

        let rows = load_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].device.as_deref(), Some("dev-1"));
        assert_eq!(rows[0].humidity, None);
        assert_eq!(rows[0].co.as_deref(), Some("0.004"));
        assert_eq!(rows[0].lpg, None);
    }
}
