//! CSV ingest for World Bank indicator exports.
//!
//! A World Bank "API_*.csv" download looks like:
//!
//! ```text
//! "Data Source","World Development Indicators",
//!
//! "Last Updated Date","2023-06-29",
//!
//! "Country Name","Country Code","Indicator Name","Indicator Code","1960",...,"2022",
//! "Aruba","ABW","Renewable electricity output ...","EG.ELC.RNEW.ZS","",...
//! ```
//!
//! The first four lines are metadata and are skipped. Year-named columns are
//! parsed as numbers (empty cells become missing values), every other column
//! is kept as text. `Country Name` is renamed to `Country`.
//!
//! Design goals:
//! - **Strict schema** for the columns the analysis needs (`ColumnNotFound`)
//! - **Cell-level tolerance**: an unparseable number is a missing value, counted
//!   and logged, never a reason to abort
//! - **No analysis logic here**

use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::{Column, Table};
use crate::error::AppError;
use crate::table::rename;

/// Metadata lines preceding the header in World Bank exports.
pub const METADATA_LINES: usize = 4;

pub const SOURCE_KEY: &str = "Country Name";
pub const KEY: &str = "Country";

/// A cell that could not be parsed as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct CellError {
    /// 1-based line number in the source file.
    pub line: usize,
    pub column: String,
    pub raw: String,
}

/// Ingest output: the table plus what happened while reading it.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub path: PathBuf,
    pub table: Table,
    pub rows_read: usize,
    pub cell_errors: Vec<CellError>,
}

/// Load an indicator CSV and check that `year` is present.
pub fn load_indicator(path: &Path, year: &str) -> Result<IngestedTable, AppError> {
    let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let ingested = parse_indicator(&text, path)?;
    ingested.table.column(KEY)?;
    ingested.table.numeric(year)?;

    info!(
        path = %path.display(),
        rows = ingested.rows_read,
        cell_errors = ingested.cell_errors.len(),
        "loaded indicator table"
    );
    Ok(ingested)
}

/// Parse the text of an indicator CSV (metadata lines included).
pub fn parse_indicator(text: &str, path: &Path) -> Result<IngestedTable, AppError> {
    let body = skip_lines(text, METADATA_LINES);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Csv {
            path: path.to_path_buf(),
            message: format!("failed to read header: {e}"),
        })?
        .iter()
        .map(normalize_header_name)
        .collect();

    // World Bank exports end every line with a comma, producing an unnamed
    // trailing column.
    let kept: Vec<(usize, &String)> = headers.iter().enumerate().filter(|(_, h)| !h.is_empty()).collect();

    let mut numeric: Vec<Vec<Option<f64>>> = vec![Vec::new(); kept.len()];
    let mut text_cells: Vec<Vec<Option<String>>> = vec![Vec::new(); kept.len()];
    let mut cell_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header sits on line METADATA_LINES + 1; records start one line later.
        let line = METADATA_LINES + idx + 2;
        let record = result.map_err(|e| AppError::Csv {
            path: path.to_path_buf(),
            message: format!("line {line}: {e}"),
        })?;
        rows_read += 1;

        for (slot, (col_idx, name)) in kept.iter().enumerate() {
            let raw = get_cell(&record, *col_idx);
            if is_year_column(name) {
                let value = match raw {
                    None => None,
                    Some(s) => match s.parse::<f64>() {
                        Ok(v) if v.is_finite() => Some(v),
                        _ => {
                            debug!(line, column = %name, raw = s, "unparseable numeric cell");
                            cell_errors.push(CellError {
                                line,
                                column: (*name).clone(),
                                raw: s.to_string(),
                            });
                            None
                        }
                    },
                };
                numeric[slot].push(value);
            } else {
                text_cells[slot].push(raw.map(str::to_string));
            }
        }
    }

    let columns = kept
        .iter()
        .enumerate()
        .map(|(slot, (_, name))| {
            if is_year_column(name) {
                Column::numeric((*name).clone(), std::mem::take(&mut numeric[slot]))
            } else {
                Column::text((*name).clone(), std::mem::take(&mut text_cells[slot]))
            }
        })
        .collect();

    let mut table = Table::new(columns)?;
    rename(&mut table, SOURCE_KEY, KEY)?;

    Ok(IngestedTable {
        path: path.to_path_buf(),
        table,
        rows_read,
        cell_errors,
    })
}

fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header; strip it so schema checks see the real name.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn is_year_column(name: &str) -> bool {
    name.len() == 4 && name.chars().all(|c| c.is_ascii_digit())
}

fn get_cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\u{feff}\"Data Source\",\"World Development Indicators\",\n\
\n\
\"Last Updated Date\",\"2023-06-29\",\n\
\n\
\"Country Name\",\"Country Code\",\"Indicator Name\",\"Indicator Code\",\"2017\",\"2018\",\n\
\"Aruba\",\"ABW\",\"Renewable\",\"EG.ELC.RNEW.ZS\",\"1.5\",\"\",\n\
\"Albania\",\"ALB\",\"Renewable\",\"EG.ELC.RNEW.ZS\",\"99.9\",\"100\",\n\
\"Chad\",\"TCD\",\"Renewable\",\"EG.ELC.RNEW.ZS\",\"n/a\",\"2.5\",\n";

    #[test]
    fn skips_metadata_and_renames_country() {
        let t = parse_indicator(SAMPLE, Path::new("sample.csv")).unwrap();
        assert_eq!(t.rows_read, 3);
        assert_eq!(
            t.table.column_names(),
            vec!["Country", "Country Code", "Indicator Name", "Indicator Code", "2017", "2018"]
        );
        assert_eq!(t.table.numeric("2018").unwrap(), &[None, Some(100.0), Some(2.5)]);
    }

    #[test]
    fn unparseable_cells_become_missing_and_are_counted() {
        let t = parse_indicator(SAMPLE, Path::new("sample.csv")).unwrap();
        assert_eq!(t.table.numeric("2017").unwrap()[2], None);
        assert_eq!(t.cell_errors.len(), 1);
        assert_eq!(t.cell_errors[0].line, 8);
        assert_eq!(t.cell_errors[0].raw, "n/a");
    }

    #[test]
    fn missing_country_column_is_reported() {
        let text = "a\nb\nc\nd\n\"Name\",\"2018\"\n\"X\",\"1\"\n";
        let err = parse_indicator(text, Path::new("bad.csv")).unwrap_err();
        assert!(matches!(err, AppError::ColumnNotFound { column } if column == "Country Name"));
    }

    #[test]
    fn load_indicator_requires_year_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renewable.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        assert!(load_indicator(&path, "2018").is_ok());
        let err = load_indicator(&path, "2019").unwrap_err();
        assert!(matches!(err, AppError::ColumnNotFound { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_indicator(Path::new("/definitely/not/here.csv"), "2018").unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
