//! Upload guard applied before a file reaches the importer.

use super::error::{ImportError, Result};

/// Maximum upload size (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 1024 * 1024;

/// Content types accepted for CSV uploads.
const ALLOWED_CONTENT_TYPES: &[&str] = &["text/csv", "application/vnd.ms-excel"];

/// Reject uploads that are not CSV files or exceed `max_size` bytes.
///
/// `content_type` is only checked when the transport supplies one.
pub fn check_upload(file_name: &str, content_type: Option<&str>, size: usize, max_size: usize) -> Result<()> {
    let is_csv_name = file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("csv"));
    if !is_csv_name {
        return Err(ImportError::InvalidUpload("Only CSV files are allowed".to_string()));
    }

    if let Some(content_type) = content_type {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if !ALLOWED_CONTENT_TYPES.iter().any(|t| t.eq_ignore_ascii_case(essence)) {
            return Err(ImportError::InvalidUpload(format!(
                "Invalid file type '{content_type}'. Only CSV files are allowed"
            )));
        }
    }

    if size == 0 {
        return Err(ImportError::EmptyInput);
    }
    if size > max_size {
        return Err(ImportError::FileTooLarge { size, limit: max_size });
    }

    Ok(())
}
