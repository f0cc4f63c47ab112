//! Upload validation and typed row parsing.
//!
//! Uploads must be CSV with a header row containing the five required
//! columns (exact, case-sensitive). Extra columns are ignored. Rows are
//! coerced into [`EquipmentRecord`] eagerly; a single bad numeric cell
//! fails the whole upload rather than producing a partial snapshot.

pub mod aggregate;

use csv::{ReaderBuilder, Trim};

use crate::error::{ApiError, ApiResult};

pub const REQUIRED_COLUMNS: [&str; 5] =
    ["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"];

/// One validated equipment row with fields coerced at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentRecord {
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// Parses an uploaded CSV byte stream into validated records.
///
/// Fails with a schema error when required columns are absent, and with a
/// parse error when the stream is not well-formed CSV or a numeric cell
/// cannot be coerced.
pub fn parse_csv(data: &[u8]) -> ApiResult<Vec<EquipmentRecord>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(data);

    let headers = reader.headers()?.clone();
    let positions = column_positions(&headers)?;

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        records.push(EquipmentRecord {
            name: field(&record, positions[0])?.to_string(),
            equipment_type: field(&record, positions[1])?.to_string(),
            flowrate: numeric_field(&record, positions[2], REQUIRED_COLUMNS[2], index)?,
            pressure: numeric_field(&record, positions[3], REQUIRED_COLUMNS[3], index)?,
            temperature: numeric_field(&record, positions[4], REQUIRED_COLUMNS[4], index)?,
        });
    }
    Ok(records)
}

/// Resolves the header position of each required column, naming every
/// missing column in the rejection.
fn column_positions(headers: &csv::StringRecord) -> ApiResult<[usize; 5]> {
    let mut positions = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, column) in REQUIRED_COLUMNS.iter().enumerate() {
        match headers.iter().position(|h| h == *column) {
            Some(index) => positions[slot] = index,
            None => missing.push(*column),
        }
    }
    if !missing.is_empty() {
        return Err(ApiError::Schema(format!(
            "Missing columns: {}. Required: {}",
            missing.join(", "),
            REQUIRED_COLUMNS.join(", ")
        )));
    }
    Ok(positions)
}

fn field(record: &csv::StringRecord, index: usize) -> ApiResult<&str> {
    record
        .get(index)
        .ok_or_else(|| ApiError::Parse("row has fewer fields than the header".to_string()))
}

fn numeric_field(
    record: &csv::StringRecord,
    index: usize,
    column: &str,
    row: usize,
) -> ApiResult<f64> {
    let raw = field(record, index)?;
    raw.parse::<f64>().map_err(|_| {
        ApiError::Parse(format!(
            "invalid numeric value '{raw}' in column '{column}' at data row {}",
            row + 1
        ))
    })
}
