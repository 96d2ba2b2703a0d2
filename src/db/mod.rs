//! Database connection pool and operations.

pub mod connection;
pub mod employee;
pub mod schema;

pub use connection::{connect, disconnect, test_connection};
pub use schema::create_tables;
