//! Batch employee import from CSV.
//!
//! The pipeline runs validating → precheck → create pass → link pass →
//! commit. Validation finishes before the database is touched; everything
//! after it happens inside one transaction, so any failure leaves the store
//! exactly as it was.

pub mod error;
pub mod parser;
pub mod upload;
pub mod writer;

use chrono::Utc;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use tracing::{error, info, warn};

use crate::entities::employees;

pub use error::{ImportError, Result};
pub use parser::{ImportRecord, ImportWarning, ParsedBatch};
pub use upload::{DEFAULT_MAX_FILE_SIZE, check_upload};

/// Import behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Also resolve manager e-mails against employees stored before this
    /// batch. Off by default: only managers inside the batch are linked.
    pub link_existing_managers: bool,
}

/// Outcome of a committed import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Created employees in file order, with final manager links.
    pub employees: Vec<employees::Model>,
    /// Soft issues that did not stop the import.
    pub warnings: Vec<ImportWarning>,
}

/// Import a CSV payload as one atomic batch, stamping `actor` as creator.
pub async fn import_from_csv<C>(db: &C, data: &[u8], actor: &str, options: &ImportOptions) -> Result<ImportReport>
where
    C: TransactionTrait,
{
    info!("Starting CSV import process");

    match run(db, data, actor, options).await {
        Ok(report) => {
            info!(
                "Successfully created {} employees ({} warnings)",
                report.employees.len(),
                report.warnings.len()
            );
            Ok(report)
        }
        Err(e) => {
            error!("Import failed: {e}");
            Err(e)
        }
    }
}

async fn run<C>(db: &C, data: &[u8], actor: &str, options: &ImportOptions) -> Result<ImportReport>
where
    C: TransactionTrait,
{
    let batch = parser::decode(data, Utc::now())?;
    info!(
        "Validated {} records, proceeding with database transaction",
        batch.records.len()
    );

    let txn = db.begin().await?;
    match write(&txn, &batch, actor, options).await {
        Ok((employees, link_warnings)) => {
            txn.commit().await?;
            let mut warnings = batch.warnings;
            warnings.extend(link_warnings);
            Ok(ImportReport { employees, warnings })
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                warn!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

async fn write(
    txn: &DatabaseTransaction,
    batch: &ParsedBatch,
    actor: &str,
    options: &ImportOptions,
) -> Result<(Vec<employees::Model>, Vec<ImportWarning>)> {
    writer::precheck(txn, batch).await?;

    info!("Creating employees in database");
    let (mut created, identity) = writer::create_pass(txn, batch, actor).await?;

    info!("Updating manager relationships");
    let warnings = writer::link_pass(txn, batch, &mut created, &identity, options).await?;

    Ok((created, warnings))
}
