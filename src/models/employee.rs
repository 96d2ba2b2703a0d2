//! Employee DTOs for create and update operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// DTO for creating an employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmployee {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub position: String,
    pub address: String,
    pub site: String,
    pub department: String,
    pub manager_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub picture: Option<String>,
    pub is_admin: bool,
}

/// DTO for updating an employee.
///
/// `None` leaves a field untouched; nullable columns use `Option<Option<_>>`
/// so they can be cleared explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEmployee {
    pub first_name: Option<String>,
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub address: Option<String>,
    pub site: Option<String>,
    pub department: Option<String>,
    pub manager_id: Option<Option<Uuid>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub picture: Option<Option<String>>,
    pub is_admin: Option<bool>,
}

/// Row as written by the import pipeline: fully normalized, manager unresolved.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub display_name: String,
    pub email: String,
    pub position: String,
    pub address: String,
    pub site: String,
    pub department: String,
    pub manager_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub picture: Option<String>,
    pub is_admin: bool,
}

impl CreateEmployee {
    /// Normalize into an insertable row; the display name is always derived.
    pub fn into_new(self) -> NewEmployee {
        let display_name = format!("{} {}", self.first_name, self.last_name);
        NewEmployee {
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            display_name,
            email: self.email.trim().to_lowercase(),
            position: self.position,
            address: self.address,
            site: self.site,
            department: self.department,
            manager_id: self.manager_id,
            start_date: self.start_date,
            end_date: self.end_date,
            picture: self.picture,
            is_admin: self.is_admin,
        }
    }
}
