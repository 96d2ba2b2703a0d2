pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod import;
pub mod models;
pub mod service;

pub use error::{AppError, Result};
pub use import::{ImportError, ImportOptions, ImportReport, import_from_csv};
pub use service::EmployeeService;
