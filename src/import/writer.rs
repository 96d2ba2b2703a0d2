//! Transactional writer: duplicate precheck, create pass, manager link pass.

use std::collections::HashMap;

use sea_orm::ConnectionTrait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ImportOptions;
use super::error::{ImportError, Result};
use super::parser::{ImportWarning, ParsedBatch};
use crate::db::employee;
use crate::entities::employees;

/// Fail with `Conflict` if any batch e-mail already belongs to a stored employee.
pub async fn precheck<C: ConnectionTrait>(db: &C, batch: &ParsedBatch) -> Result<()> {
    let existing = employee::find_by_emails(db, &batch.emails()).await?;
    if existing.is_empty() {
        return Ok(());
    }

    let emails: Vec<String> = existing.into_iter().map(|e| e.email).collect();
    Err(ImportError::Conflict(emails))
}

/// Pass 1: insert every record with no manager. Returns the created rows in
/// file order plus the identity map (e-mail to generated id).
pub async fn create_pass<C: ConnectionTrait>(
    db: &C,
    batch: &ParsedBatch,
    actor: &str,
) -> Result<(Vec<employees::Model>, HashMap<String, Uuid>)> {
    let mut created = Vec::with_capacity(batch.records.len());
    let mut identity = HashMap::with_capacity(batch.records.len());

    for record in &batch.records {
        let email = record.employee.email.clone();
        debug!("Creating employee from row {}: {email}", record.row);

        let mut data = record.employee.clone();
        data.manager_id = None;

        let model = employee::create(db, data, actor)
            .await
            .map_err(|source| ImportError::Row { email, source })?;

        identity.insert(model.email.clone(), model.id);
        created.push(model);
    }

    info!("Created {} employees", created.len());
    Ok((created, identity))
}

/// Pass 2: back-fill `manager_id` from the identity map. Unknown managers are
/// skipped with a warning. `created` is updated in place.
pub async fn link_pass<C: ConnectionTrait>(
    db: &C,
    batch: &ParsedBatch,
    created: &mut [employees::Model],
    identity: &HashMap<String, Uuid>,
    options: &ImportOptions,
) -> Result<Vec<ImportWarning>> {
    let existing = if options.link_existing_managers {
        existing_managers(db, batch, identity).await?
    } else {
        HashMap::new()
    };

    let mut warnings = Vec::new();
    for (record, model) in batch.records.iter().zip(created.iter_mut()) {
        let Some(manager_email) = &record.manager_email else {
            continue;
        };

        match identity.get(manager_email).or_else(|| existing.get(manager_email)) {
            Some(&manager_id) => {
                *model = employee::set_manager(db, model.id, Some(manager_id)).await?;
                info!("Updated manager for {} to {manager_email}", model.email);
            }
            None => {
                warn!("Manager {manager_email} not found for employee {}", model.email);
                warnings.push(ImportWarning::UnresolvedManager {
                    email: model.email.clone(),
                    manager_email: manager_email.clone(),
                });
            }
        }
    }

    Ok(warnings)
}

/// Look up referenced managers that are not part of this batch.
async fn existing_managers<C: ConnectionTrait>(
    db: &C,
    batch: &ParsedBatch,
    identity: &HashMap<String, Uuid>,
) -> Result<HashMap<String, Uuid>> {
    let outside: Vec<String> = batch
        .manager_emails
        .iter()
        .filter(|email| !identity.contains_key(*email))
        .cloned()
        .collect();

    let found = employee::find_by_emails(db, &outside).await?;
    debug!("Resolved {} managers outside the batch", found.len());
    Ok(found.into_iter().map(|e| (e.email, e.id)).collect())
}
