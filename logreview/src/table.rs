use crate::error::ReviewError;
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Fails with `MissingColumns` naming every required header that is absent.
pub fn check_columns(headers: &StringRecord, table: &str, required: &[&str]) -> Result<(), ReviewError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReviewError::MissingColumns { table: table.to_string(), columns: missing })
    }
}

/// Read a CSV table, validating its header row before any record is decoded.
pub fn read_records<T, R>(reader: R, table: &str, required: &[&str]) -> Result<Vec<T>, ReviewError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
    let headers = rdr.headers()?.clone();
    check_columns(&headers, table, required)?;
    let mut out = Vec::new();
    for rec in rdr.deserialize() {
        out.push(rec?);
    }
    Ok(out)
}

pub fn open_file(path: &Path) -> Result<File, ReviewError> {
    File::open(path).map_err(|source| ReviewError::File { path: path.to_path_buf(), source })
}

pub fn create_file(path: &Path) -> Result<File, ReviewError> {
    File::create(path).map_err(|source| ReviewError::File { path: path.to_path_buf(), source })
}

pub fn read_records_from_path<T: DeserializeOwned>(
    path: &Path,
    table: &str,
    required: &[&str],
) -> Result<Vec<T>, ReviewError> {
    read_records(open_file(path)?, table, required)
}

pub fn write_records<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<(), ReviewError> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_records_to_path<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ReviewError> {
    write_records(create_file(path)?, rows)
}
