//! Employee repository with CRUD operations.
//!
//! Every function is generic over `ConnectionTrait`, so the same calls run
//! against the pool or inside a `DatabaseTransaction`.

use crate::entities::{employees, prelude::*};
use crate::models::employee::{NewEmployee, UpdateEmployee};
use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

/// List all employees ordered by last and first name.
pub async fn list_all<C: ConnectionTrait>(db: &C) -> Result<Vec<employees::Model>, DbErr> {
    Employees::find()
        .order_by_asc(employees::Column::LastName)
        .order_by_asc(employees::Column::FirstName)
        .all(db)
        .await
}

/// Get employee by ID.
pub async fn get_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<employees::Model>, DbErr> {
    Employees::find_by_id(id).one(db).await
}

/// Get employee by e-mail. The lookup is case-insensitive because stored
/// addresses are always lower-case.
pub async fn get_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<employees::Model>, DbErr> {
    Employees::find()
        .filter(employees::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
}

/// Get every employee whose e-mail is in `emails` (expected lower-case).
pub async fn find_by_emails<C: ConnectionTrait>(db: &C, emails: &[String]) -> Result<Vec<employees::Model>, DbErr> {
    if emails.is_empty() {
        return Ok(Vec::new());
    }

    Employees::find()
        .filter(employees::Column::Email.is_in(emails.iter().cloned()))
        .order_by_asc(employees::Column::Email)
        .all(db)
        .await
}

/// Get direct reports of a manager.
pub async fn find_subordinates<C: ConnectionTrait>(db: &C, manager_id: Uuid) -> Result<Vec<employees::Model>, DbErr> {
    Employees::find()
        .filter(employees::Column::ManagerId.eq(manager_id))
        .order_by_asc(employees::Column::LastName)
        .order_by_asc(employees::Column::FirstName)
        .all(db)
        .await
}

/// Insert a new employee with a freshly generated id.
pub async fn create<C: ConnectionTrait>(db: &C, data: NewEmployee, actor: &str) -> Result<employees::Model, DbErr> {
    let now = Utc::now();
    let model = employees::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(data.first_name),
        middle_name: Set(data.middle_name),
        last_name: Set(data.last_name),
        display_name: Set(data.display_name),
        email: Set(data.email),
        position: Set(data.position),
        address: Set(data.address),
        site: Set(data.site),
        department: Set(data.department),
        manager_id: Set(data.manager_id),
        start_date: Set(data.start_date),
        end_date: Set(data.end_date),
        picture: Set(data.picture),
        is_admin: Set(data.is_admin),
        created_at: Set(now),
        created_by: Set(actor.to_owned()),
        updated_at: Set(now),
        updated_by: Set(actor.to_owned()),
    };
    model.insert(db).await
}

/// Update an existing employee.
///
/// The display name is recomputed only when both names are supplied.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    data: UpdateEmployee,
    actor: &str,
) -> Result<Option<employees::Model>, DbErr> {
    let existing = Employees::find_by_id(id).one(db).await?;

    match existing {
        Some(model) => {
            let mut active: employees::ActiveModel = model.into();

            if let (Some(first), Some(last)) = (&data.first_name, &data.last_name) {
                active.display_name = Set(format!("{first} {last}"));
            }
            if let Some(first_name) = data.first_name {
                active.first_name = Set(first_name);
            }
            if let Some(middle_name) = data.middle_name {
                active.middle_name = Set(middle_name);
            }
            if let Some(last_name) = data.last_name {
                active.last_name = Set(last_name);
            }
            if let Some(email) = data.email {
                active.email = Set(email.trim().to_lowercase());
            }
            if let Some(position) = data.position {
                active.position = Set(position);
            }
            if let Some(address) = data.address {
                active.address = Set(address);
            }
            if let Some(site) = data.site {
                active.site = Set(site);
            }
            if let Some(department) = data.department {
                active.department = Set(department);
            }
            if let Some(manager_id) = data.manager_id {
                active.manager_id = Set(manager_id);
            }
            if let Some(start_date) = data.start_date {
                active.start_date = Set(start_date);
            }
            if let Some(end_date) = data.end_date {
                active.end_date = Set(end_date);
            }
            if let Some(picture) = data.picture {
                active.picture = Set(picture);
            }
            if let Some(is_admin) = data.is_admin {
                active.is_admin = Set(is_admin);
            }
            active.updated_at = Set(Utc::now());
            active.updated_by = Set(actor.to_owned());

            let updated = active.update(db).await?;
            Ok(Some(updated))
        }
        None => Ok(None),
    }
}

/// Point an employee at a manager.
///
/// Fails with `DbErr::RecordNotUpdated` if the employee does not exist.
pub async fn set_manager<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    manager_id: Option<Uuid>,
) -> Result<employees::Model, DbErr> {
    let active = employees::ActiveModel {
        id: Set(id),
        manager_id: Set(manager_id),
        ..Default::default()
    };
    active.update(db).await
}

/// Delete an employee by ID.
pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool, DbErr> {
    let result = Employees::delete_by_id(id).exec(db).await?;
    Ok(result.rows_affected > 0)
}

/// Delete every employee. Returns the number of rows removed.
pub async fn delete_all<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    // Manager links first, so the self reference never blocks the delete.
    Employees::update_many()
        .col_expr(employees::Column::ManagerId, sea_query::Expr::value(Option::<Uuid>::None))
        .exec(db)
        .await?;

    let result = Employees::delete_many().exec(db).await?;
    Ok(result.rows_affected)
}

/// Check if an e-mail is already taken (for validation).
pub async fn email_exists<C: ConnectionTrait>(db: &C, email: &str, exclude_id: Option<Uuid>) -> Result<bool, DbErr> {
    let mut query = Employees::find().filter(employees::Column::Email.eq(email.trim().to_lowercase()));

    if let Some(id) = exclude_id {
        query = query.filter(employees::Column::Id.ne(id));
    }

    let count = query.count(db).await?;
    Ok(count > 0)
}

/// Get total employee count.
pub async fn count_all<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    Employees::find().count(db).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_db;

    fn new_employee(first: &str, last: &str, email: &str) -> NewEmployee {
        NewEmployee {
            first_name: first.to_string(),
            middle_name: None,
            last_name: last.to_string(),
            display_name: format!("{first} {last}"),
            email: email.to_string(),
            position: "Employee".to_string(),
            address: String::new(),
            site: "Main Office".to_string(),
            department: "General".to_string(),
            manager_id: None,
            start_date: Utc::now(),
            end_date: None,
            picture: None,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = memory_db().await;
        let created = create(&db, new_employee("Ada", "Lovelace", "ada@example.com"), "tester")
            .await
            .unwrap();

        assert_eq!(created.created_by, "tester");
        assert_eq!(created.updated_by, "tester");
        assert_eq!(get_by_id(&db, created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(get_by_email(&db, "ADA@example.com").await.unwrap(), Some(created));
        assert_eq!(count_all(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let db = memory_db().await;
        create(&db, new_employee("Ada", "Lovelace", "ada@example.com"), "tester")
            .await
            .unwrap();

        let err = create(&db, new_employee("Ada", "Byron", "ada@example.com"), "tester")
            .await
            .unwrap_err();
        assert!(matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_set_manager_and_subordinates() {
        let db = memory_db().await;
        let boss = create(&db, new_employee("Grace", "Hopper", "grace@example.com"), "tester")
            .await
            .unwrap();
        let report = create(&db, new_employee("Alan", "Turing", "alan@example.com"), "tester")
            .await
            .unwrap();

        let linked = set_manager(&db, report.id, Some(boss.id)).await.unwrap();
        assert_eq!(linked.manager_id, Some(boss.id));

        let subordinates = find_subordinates(&db, boss.id).await.unwrap();
        assert_eq!(subordinates.len(), 1);
        assert_eq!(subordinates[0].id, report.id);
    }

    #[tokio::test]
    async fn test_set_manager_missing_employee() {
        let db = memory_db().await;
        let err = set_manager(&db, Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, DbErr::RecordNotUpdated));
    }

    #[tokio::test]
    async fn test_update_recomputes_display_name() {
        let db = memory_db().await;
        let created = create(&db, new_employee("Ada", "Lovelace", "ada@example.com"), "tester")
            .await
            .unwrap();

        let data = UpdateEmployee {
            first_name: Some("Augusta".to_string()),
            last_name: Some("King".to_string()),
            email: Some("Augusta@Example.com".to_string()),
            ..Default::default()
        };
        let updated = update(&db, created.id, data, "editor").await.unwrap().unwrap();

        assert_eq!(updated.display_name, "Augusta King");
        assert_eq!(updated.email, "augusta@example.com");
        assert_eq!(updated.updated_by, "editor");
        assert_eq!(updated.created_by, "tester");

        let only_first = UpdateEmployee {
            first_name: Some("Ada".to_string()),
            ..Default::default()
        };
        let updated = update(&db, created.id, only_first, "editor").await.unwrap().unwrap();
        assert_eq!(updated.display_name, "Augusta King");
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let db = memory_db().await;
        let result = update(&db, Uuid::new_v4(), UpdateEmployee::default(), "editor")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_email_exists_excludes_self() {
        let db = memory_db().await;
        let created = create(&db, new_employee("Ada", "Lovelace", "ada@example.com"), "tester")
            .await
            .unwrap();

        assert!(email_exists(&db, "ada@example.com", None).await.unwrap());
        assert!(!email_exists(&db, "ada@example.com", Some(created.id)).await.unwrap());
        assert!(!email_exists(&db, "nobody@example.com", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_emails() {
        let db = memory_db().await;
        create(&db, new_employee("Ada", "Lovelace", "ada@example.com"), "tester")
            .await
            .unwrap();
        create(&db, new_employee("Alan", "Turing", "alan@example.com"), "tester")
            .await
            .unwrap();

        let found = find_by_emails(&db, &["alan@example.com".to_string(), "x@example.com".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "alan@example.com");
        assert!(find_by_emails(&db, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let db = memory_db().await;
        let boss = create(&db, new_employee("Grace", "Hopper", "grace@example.com"), "tester")
            .await
            .unwrap();
        let report = create(&db, new_employee("Alan", "Turing", "alan@example.com"), "tester")
            .await
            .unwrap();
        set_manager(&db, report.id, Some(boss.id)).await.unwrap();
        create(&db, new_employee("Ada", "Lovelace", "ada@example.com"), "tester")
            .await
            .unwrap();

        assert!(delete(&db, boss.id).await.unwrap());
        assert!(!delete(&db, boss.id).await.unwrap());
        let orphan = get_by_id(&db, report.id).await.unwrap().unwrap();
        assert_eq!(orphan.manager_id, None);

        assert_eq!(delete_all(&db).await.unwrap(), 2);
        assert_eq!(count_all(&db).await.unwrap(), 0);
    }
}
