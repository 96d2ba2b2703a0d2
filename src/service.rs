//! Employee service orchestration.

use std::path::Path;

use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::db::employee;
use crate::entities::employees;
use crate::error::{AppError, Result};
use crate::import::{self, ImportReport, check_upload, parser::is_valid_email};
use crate::models::employee::{CreateEmployee, UpdateEmployee};

/// Actor recorded for rows created by the seeder.
pub const SEED_ACTOR: &str = "system-seeder";

/// Outcome of a seed attempt.
#[derive(Debug)]
pub enum SeedOutcome {
    /// Table was empty and the file was imported.
    Seeded(ImportReport),
    /// Table already had this many employees; nothing was done.
    Skipped(u64),
}

/// Service for employee records and batch imports.
pub struct EmployeeService {
    db: DatabaseConnection,
    import: ImportConfig,
}

impl EmployeeService {
    /// Create a new employee service.
    pub fn new(db: DatabaseConnection, import: ImportConfig) -> Self {
        Self { db, import }
    }

    /// Create a single employee. The e-mail must be well-formed and unused.
    pub async fn create(&self, data: CreateEmployee, actor: &str) -> Result<employees::Model> {
        let data = data.into_new();
        if data.first_name.trim().is_empty() || data.last_name.trim().is_empty() {
            return Err(AppError::validation("First and last name are required"));
        }
        if !is_valid_email(&data.email) {
            return Err(AppError::validation(format!("Invalid email format for {}", data.email)));
        }
        if employee::get_by_email(&self.db, &data.email).await?.is_some() {
            return Err(email_taken(&data.email));
        }
        if let Some(manager_id) = data.manager_id {
            self.ensure_manager_exists(manager_id).await?;
        }

        let email = data.email.clone();
        let created = employee::create(&self.db, data, actor)
            .await
            .map_err(|e| unique_violation_to_conflict(e, &email))?;
        info!("Created employee {} ({})", created.email, created.id);
        Ok(created)
    }

    /// List all employees.
    pub async fn list(&self) -> Result<Vec<employees::Model>> {
        Ok(employee::list_all(&self.db).await?)
    }

    /// Get one employee or fail with `NotFound`.
    pub async fn get(&self, id: Uuid) -> Result<employees::Model> {
        employee::get_by_id(&self.db, id).await?.ok_or_else(|| not_found(id))
    }

    /// Partially update an employee, re-checking e-mail uniqueness when it changes.
    pub async fn update(&self, id: Uuid, data: UpdateEmployee, actor: &str) -> Result<employees::Model> {
        if employee::get_by_id(&self.db, id).await?.is_none() {
            return Err(not_found(id));
        }

        let new_email = data.email.as_ref().map(|e| e.trim().to_lowercase());
        if let Some(email) = &new_email {
            if !is_valid_email(email) {
                return Err(AppError::validation(format!("Invalid email format for {email}")));
            }
            if employee::email_exists(&self.db, email, Some(id)).await? {
                return Err(email_taken(email));
            }
        }
        if let Some(Some(manager_id)) = data.manager_id {
            if manager_id == id {
                return Err(AppError::validation("An employee cannot manage themselves"));
            }
            self.ensure_manager_exists(manager_id).await?;
        }

        let updated = employee::update(&self.db, id, data, actor)
            .await
            .map_err(|e| unique_violation_to_conflict(e, new_email.as_deref().unwrap_or_default()))?;
        updated.ok_or_else(|| not_found(id))
    }

    /// Delete an employee, returning the removed record.
    pub async fn delete(&self, id: Uuid) -> Result<employees::Model> {
        let existing = self.get(id).await?;
        if !employee::delete(&self.db, id).await? {
            return Err(not_found(id));
        }
        info!("Deleted employee {} ({})", existing.email, id);
        Ok(existing)
    }

    async fn ensure_manager_exists(&self, manager_id: Uuid) -> Result<()> {
        if employee::get_by_id(&self.db, manager_id).await?.is_none() {
            return Err(AppError::not_found(format!("Manager with ID {manager_id} not found")));
        }
        Ok(())
    }

    /// Direct reports of a manager.
    pub async fn subordinates(&self, manager_id: Uuid) -> Result<Vec<employees::Model>> {
        Ok(employee::find_subordinates(&self.db, manager_id).await?)
    }

    /// Import an in-memory CSV payload as one batch.
    pub async fn import_csv(&self, data: &[u8], actor: &str) -> Result<ImportReport> {
        Ok(import::import_from_csv(&self.db, data, actor, &self.import.options()).await?)
    }

    /// Import a CSV file after applying the upload guard.
    pub async fn import_file(&self, path: &Path, actor: &str) -> Result<ImportReport> {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let size = usize::try_from(std::fs::metadata(path)?.len()).unwrap_or(usize::MAX);
        check_upload(file_name, None, size, self.import.max_file_size)?;

        debug!("Received file: {file_name}, size: {size} bytes");
        let data = tokio::fs::read(path).await?;
        self.import_csv(&data, actor).await
    }

    /// Import `path` only when no employees exist yet.
    pub async fn seed(&self, path: &Path) -> Result<SeedOutcome> {
        let count = employee::count_all(&self.db).await?;
        if count > 0 {
            info!("Database already contains {count} employees. Skipping seeding process.");
            return Ok(SeedOutcome::Skipped(count));
        }

        if !path.exists() {
            return Err(AppError::not_found(format!("Seed file {} not found", path.display())));
        }

        info!("Database is empty. Seeding from {}", path.display());
        let data = tokio::fs::read(path).await?;
        let report = self.import_csv(&data, SEED_ACTOR).await?;
        Ok(SeedOutcome::Seeded(report))
    }

    /// Remove every employee.
    pub async fn clear(&self) -> Result<u64> {
        let removed = employee::delete_all(&self.db).await?;
        info!("Cleared {removed} employees from the database");
        Ok(removed)
    }

    /// Number of stored employees.
    pub async fn count(&self) -> Result<u64> {
        Ok(employee::count_all(&self.db).await?)
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Employee with ID {id} not found"))
}

fn email_taken(email: &str) -> AppError {
    AppError::conflict(format!("Employee with email {email} already exists"))
}

/// Unique index hits that slip past the precheck (concurrent writers) still
/// surface as conflicts.
fn unique_violation_to_conflict(err: DbErr, email: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => email_taken(email),
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_db;
    use crate::import::ImportError;
    use chrono::Utc;

    async fn service() -> EmployeeService {
        EmployeeService::new(memory_db().await, ImportConfig::default())
    }

    fn create_dto(first: &str, last: &str, email: &str) -> CreateEmployee {
        CreateEmployee {
            first_name: first.to_string(),
            middle_name: None,
            last_name: last.to_string(),
            email: email.to_string(),
            position: "Engineer".to_string(),
            address: String::new(),
            site: "Main Office".to_string(),
            department: "R&D".to_string(),
            manager_id: None,
            start_date: Utc::now(),
            end_date: None,
            picture: None,
            is_admin: false,
        }
    }

    fn csv_file(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_create_derives_display_name_and_lowercases() {
        let service = service().await;
        let created = service
            .create(create_dto("Ada", "Lovelace", "Ada@Example.com"), "admin")
            .await
            .unwrap();

        assert_eq!(created.display_name, "Ada Lovelace");
        assert_eq!(created.email, "ada@example.com");
        assert_eq!(service.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_conflict_is_case_insensitive() {
        let service = service().await;
        service
            .create(create_dto("Ada", "Lovelace", "ada@example.com"), "admin")
            .await
            .unwrap();

        let err = service
            .create(create_dto("Ada", "Other", "ADA@example.com"), "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_email() {
        let service = service().await;
        let err = service
            .create(create_dto("Ada", "Lovelace", "not-an-email"), "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_with_manager() {
        let service = service().await;
        let boss = service
            .create(create_dto("Grace", "Hopper", "grace@example.com"), "admin")
            .await
            .unwrap();

        let mut dto = create_dto("Ada", "Lovelace", "ada@example.com");
        dto.manager_id = Some(boss.id);
        let created = service.create(dto, "admin").await.unwrap();
        assert_eq!(created.manager_id, Some(boss.id));

        let mut dto = create_dto("Alan", "Turing", "alan@example.com");
        dto.manager_id = Some(Uuid::new_v4());
        let err = service.create(dto, "admin").await.unwrap_err();
        match err {
            AppError::NotFound(msg) => assert!(msg.starts_with("Manager with ID")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(service.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let service = service().await;
        let id = Uuid::new_v4();
        assert!(matches!(service.get(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            service.update(id, UpdateEmployee::default(), "admin").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_email_uniqueness() {
        let service = service().await;
        let ada = service
            .create(create_dto("Ada", "Lovelace", "ada@example.com"), "admin")
            .await
            .unwrap();
        service
            .create(create_dto("Alan", "Turing", "alan@example.com"), "admin")
            .await
            .unwrap();

        let taken = UpdateEmployee {
            email: Some("Alan@example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(ada.id, taken, "editor").await,
            Err(AppError::Conflict(_))
        ));

        let same = UpdateEmployee {
            email: Some("ada@example.com".to_string()),
            position: Some("Analyst".to_string()),
            ..Default::default()
        };
        let updated = service.update(ada.id, same, "editor").await.unwrap();
        assert_eq!(updated.position, "Analyst");
        assert_eq!(updated.updated_by, "editor");
    }

    #[tokio::test]
    async fn test_update_manager_checks() {
        let service = service().await;
        let boss = service
            .create(create_dto("Grace", "Hopper", "grace@example.com"), "admin")
            .await
            .unwrap();
        let report = service
            .create(create_dto("Alan", "Turing", "alan@example.com"), "admin")
            .await
            .unwrap();

        let self_managed = UpdateEmployee {
            manager_id: Some(Some(report.id)),
            ..Default::default()
        };
        assert!(matches!(
            service.update(report.id, self_managed, "admin").await,
            Err(AppError::Validation(_))
        ));

        let unknown = UpdateEmployee {
            manager_id: Some(Some(Uuid::new_v4())),
            ..Default::default()
        };
        assert!(matches!(
            service.update(report.id, unknown, "admin").await,
            Err(AppError::NotFound(_))
        ));

        let link = UpdateEmployee {
            manager_id: Some(Some(boss.id)),
            ..Default::default()
        };
        service.update(report.id, link, "admin").await.unwrap();

        let subordinates = service.subordinates(boss.id).await.unwrap();
        assert_eq!(subordinates.len(), 1);
        assert_eq!(subordinates[0].id, report.id);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_record() {
        let service = service().await;
        let ada = service
            .create(create_dto("Ada", "Lovelace", "ada@example.com"), "admin")
            .await
            .unwrap();

        let removed = service.delete(ada.id).await.unwrap();
        assert_eq!(removed.id, ada.id);
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_file_applies_upload_guard() {
        let service = service().await;
        let (_dir, path) = csv_file("staff.txt", "firstName,lastName,email\nAda,Lovelace,ada@x.com\n");

        let err = service.import_file(&path, "admin").await.unwrap_err();
        assert!(matches!(err, AppError::Import(ImportError::InvalidUpload(_))));
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_file_too_large() {
        let config = ImportConfig {
            max_file_size: 16,
            ..Default::default()
        };
        let service = EmployeeService::new(memory_db().await, config);
        let (_dir, path) = csv_file("staff.csv", "firstName,lastName,email\nAda,Lovelace,ada@x.com\n");

        let err = service.import_file(&path, "admin").await.unwrap_err();
        assert!(matches!(err, AppError::Import(ImportError::FileTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_import_file() {
        let service = service().await;
        let (_dir, path) = csv_file(
            "staff.csv",
            "firstName,lastName,email,managerEmail\nAda,Lovelace,ada@x.com,\nAlan,Turing,alan@x.com,ada@x.com\n",
        );

        let report = service.import_file(&path, "admin").await.unwrap();
        assert_eq!(report.employees.len(), 2);
        assert_eq!(report.employees[1].manager_id, Some(report.employees[0].id));
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let service = service().await;
        let (_dir, path) = csv_file("employees.csv", "firstName,lastName,email\nAda,Lovelace,ada@x.com\n");

        match service.seed(&path).await.unwrap() {
            SeedOutcome::Seeded(report) => {
                assert_eq!(report.employees.len(), 1);
                assert_eq!(report.employees[0].created_by, SEED_ACTOR);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert!(matches!(service.seed(&path).await.unwrap(), SeedOutcome::Skipped(1)));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_bundled_file() {
        let service = service().await;
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/employees.csv"));

        let SeedOutcome::Seeded(report) = service.seed(path).await.unwrap() else {
            panic!("expected a seeded outcome");
        };
        assert_eq!(report.employees.len(), 6);
        assert!(report.warnings.is_empty());

        let by_email = |email: &str| {
            report
                .employees
                .iter()
                .find(|e| e.email == email)
                .cloned()
                .unwrap()
        };
        let ceo = by_email("margaret.hamilton@example.com");
        let head = by_email("katherine.johnson@example.com");
        assert_eq!(ceo.manager_id, None);
        assert!(ceo.is_admin);
        assert_eq!(head.display_name, "Kathy Johnson");
        assert_eq!(head.manager_id, Some(ceo.id));
        assert_eq!(service.subordinates(head.id).await.unwrap().len(), 2);
        assert!(by_email("john.backus@example.com").end_date.is_some());
    }

    #[tokio::test]
    async fn test_seed_missing_file() {
        let service = service().await;
        let err = service.seed(Path::new("/nonexistent/employees.csv")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_clear() {
        let service = service().await;
        service
            .import_csv(b"firstName,lastName,email\nAda,Lovelace,ada@x.com\nAlan,Turing,alan@x.com\n", "admin")
            .await
            .unwrap();

        assert_eq!(service.clear().await.unwrap(), 2);
        assert_eq!(service.count().await.unwrap(), 0);
    }
}
