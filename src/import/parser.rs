//! CSV decoding and row validation for employee imports.
//!
//! Every recognised column is declared as text in [`CsvRow`]; dates and
//! booleans are converted here explicitly instead of being inferred by the
//! reader. Hard failures (shape, identity fields) abort the batch, date
//! problems only produce warnings.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::{ImportError, Result};
use crate::models::employee::NewEmployee;

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub const DEFAULT_POSITION: &str = "Employee";
pub const DEFAULT_SITE: &str = "Main Office";
pub const DEFAULT_DEPARTMENT: &str = "General";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Column schema of an import file. Unknown columns are ignored.
#[derive(Debug, Default, Deserialize)]
struct CsvRow {
    #[serde(rename = "firstName")]
    first_name: Option<String>,
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    #[serde(rename = "middleName")]
    middle_name: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    email: Option<String>,
    position: Option<String>,
    address: Option<String>,
    site: Option<String>,
    #[serde(rename = "managerEmail")]
    manager_email: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    department: Option<String>,
    picture: Option<String>,
    #[serde(rename = "isAdmin")]
    is_admin: Option<String>,
}

/// One validated CSV row.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    /// 1-based data row index (header excluded).
    pub row: usize,
    pub employee: NewEmployee,
    /// Lower-cased manager address, resolved after all rows exist.
    pub manager_email: Option<String>,
}

/// Non-fatal issue found while importing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// Start date could not be parsed; the import time was used instead.
    InvalidStartDate { email: String, value: String },
    /// End date could not be parsed; it was left empty.
    InvalidEndDate { email: String, value: String },
    /// Manager address matched no employee; the link was skipped.
    UnresolvedManager { email: String, manager_email: String },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStartDate { email, value } => {
                write!(f, "Invalid startDate '{value}' for employee {email}, using current date")
            }
            Self::InvalidEndDate { email, value } => {
                write!(f, "Invalid endDate '{value}' for employee {email}, setting to null")
            }
            Self::UnresolvedManager { email, manager_email } => {
                write!(f, "Manager {manager_email} not found for employee {email}")
            }
        }
    }
}

/// Output of the decode stage.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub records: Vec<ImportRecord>,
    /// Distinct, well-formed manager addresses referenced by the batch.
    pub manager_emails: BTreeSet<String>,
    pub warnings: Vec<ImportWarning>,
}

impl ParsedBatch {
    /// E-mails of every record, in file order.
    pub fn emails(&self) -> Vec<String> {
        self.records.iter().map(|r| r.employee.email.clone()).collect()
    }
}

/// Check an address against the import e-mail pattern.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Parse a date column, accepting timestamps and plain dates. Naive values
/// are taken as UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Decode and validate a raw CSV upload.
///
/// `now` stands in for missing or unparseable start dates so the whole batch
/// shares one timestamp.
pub fn decode(data: &[u8], now: DateTime<Utc>) -> Result<ParsedBatch> {
    let data = strip_utf8_bom(data);
    if std::str::from_utf8(data).is_ok_and(|text| text.trim().is_empty()) {
        return Err(ImportError::EmptyInput);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    reader.headers().map_err(|e| ImportError::Parse(e.to_string()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        rows.push(result.map_err(|e| ImportError::Parse(e.to_string()))?);
    }

    if rows.is_empty() {
        return Err(ImportError::NoRecords);
    }

    debug!("Found {} records in CSV", rows.len());

    let mut batch = ParsedBatch::default();
    for (idx, row) in rows.into_iter().enumerate() {
        let record = validate_row(idx + 1, row, now, &mut batch)?;
        batch.records.push(record);
    }

    Ok(batch)
}

fn validate_row(row_number: usize, row: CsvRow, now: DateTime<Utc>, batch: &mut ParsedBatch) -> Result<ImportRecord> {
    let (Some(first_name), Some(last_name), Some(raw_email)) =
        (non_empty(row.first_name), non_empty(row.last_name), non_empty(row.email))
    else {
        return Err(ImportError::validation(
            row_number,
            "missing required fields (firstName, lastName, or email)",
        ));
    };

    if !is_valid_email(&raw_email) {
        return Err(ImportError::validation(
            row_number,
            format!("invalid email format for {raw_email}"),
        ));
    }
    let email = raw_email.to_lowercase();

    let manager_email = non_empty(row.manager_email).map(|m| m.to_lowercase());
    if let Some(manager) = manager_email.as_ref().filter(|m| is_valid_email(m)) {
        batch.manager_emails.insert(manager.clone());
    }

    let start_date = match non_empty(row.start_date) {
        Some(value) => parse_date(&value).unwrap_or_else(|| {
            warn!("Invalid startDate for employee {email}, using current date");
            batch.warnings.push(ImportWarning::InvalidStartDate {
                email: email.clone(),
                value,
            });
            now
        }),
        None => now,
    };

    let end_date = match non_empty(row.end_date) {
        Some(value) => {
            let parsed = parse_date(&value);
            if parsed.is_none() {
                warn!("Invalid endDate for employee {email}, setting to null");
                batch.warnings.push(ImportWarning::InvalidEndDate {
                    email: email.clone(),
                    value,
                });
            }
            parsed
        }
        None => None,
    };

    let display_name = non_empty(row.display_name).unwrap_or_else(|| format!("{first_name} {last_name}"));

    Ok(ImportRecord {
        row: row_number,
        employee: NewEmployee {
            first_name,
            middle_name: non_empty(row.middle_name),
            last_name,
            display_name,
            email,
            position: non_empty(row.position).unwrap_or_else(|| DEFAULT_POSITION.to_string()),
            address: non_empty(row.address).unwrap_or_default(),
            site: non_empty(row.site).unwrap_or_else(|| DEFAULT_SITE.to_string()),
            department: non_empty(row.department).unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
            manager_id: None,
            start_date,
            end_date,
            picture: non_empty(row.picture),
            is_admin: row.is_admin.as_deref() == Some("true"),
        },
        manager_email,
    })
}
