//! JSON and CSV export / import of the flat menu collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use super::model::{ImportRecord, MenuId, MenuRecord, MenuTarget};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferFormat {
    #[default]
    Json,
    Csv,
}

impl TransferFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            TransferFormat::Json => "application/json",
            TransferFormat::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TransferFormat::Json => "json",
            TransferFormat::Csv => "csv",
        }
    }

    /// Guess from a file name, defaulting to JSON
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => TransferFormat::Csv,
            _ => TransferFormat::Json,
        }
    }
}

impl FromStr for TransferFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(TransferFormat::Json),
            "csv" => Ok(TransferFormat::Csv),
            other => Err(TransferError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("unknown format '{0}', expected json or csv")]
    UnknownFormat(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("CSV writer failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat CSV row; every column is always present
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: MenuId,
    name: &'a str,
    display_name: &'a str,
    url: &'a str,
    icon: Option<&'a str>,
    description: Option<&'a str>,
    parent_id: Option<MenuId>,
    sort_order: i32,
    is_active: bool,
    target: MenuTarget,
    permission: Option<&'a str>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'a> From<&'a MenuRecord> for CsvRow<'a> {
    fn from(r: &'a MenuRecord) -> Self {
        Self {
            id: r.id,
            name: &r.name,
            display_name: &r.display_name,
            url: &r.url,
            icon: r.icon.as_deref(),
            description: r.description.as_deref(),
            parent_id: r.parent_id,
            sort_order: r.sort_order,
            is_active: r.is_active,
            target: r.target,
            permission: r.permission.as_deref(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub fn export<'a, I>(records: I, format: TransferFormat) -> Result<String, TransferError>
where
    I: IntoIterator<Item = &'a MenuRecord>,
{
    match format {
        TransferFormat::Json => {
            let records: Vec<&MenuRecord> = records.into_iter().collect();
            Ok(serde_json::to_string_pretty(&records)?)
        }
        TransferFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for record in records {
                writer.serialize(CsvRow::from(record))?;
            }
            let bytes = writer.into_inner().map_err(|e| e.into_error())?;
            Ok(String::from_utf8(bytes)?)
        }
    }
}

/// Parses an export back into import records.
pub fn parse(content: &str, format: TransferFormat) -> Result<Vec<ImportRecord>, TransferError> {
    match format {
        TransferFormat::Json => Ok(serde_json::from_str(content)?),
        TransferFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(content.as_bytes());
            let mut records = Vec::new();
            for row in reader.deserialize() {
                records.push(row?);
            }
            Ok(records)
        }
    }
}
