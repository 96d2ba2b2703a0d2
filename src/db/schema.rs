//! Schema bootstrap derived from the entity definitions.

use crate::entities::prelude::*;
use sea_orm::{ConnectionTrait, DbErr, Schema};

/// Create the `employees` table (with its unique e-mail index and manager
/// foreign key) if it does not exist yet.
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut stmt = schema.create_table_from_entity(Employees);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;

    Ok(())
}
