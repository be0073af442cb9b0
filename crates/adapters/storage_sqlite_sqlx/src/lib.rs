//! # pillminder-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement `MedicineRepository` and `DeliveryLog` from `pillminder-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `pillminder-app` (for port traits) and `pillminder-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod delivery_log;
pub mod error;
pub mod medicine_repo;
pub mod pool;

mod codec;

pub use delivery_log::SqliteDeliveryLog;
pub use error::StorageError;
pub use medicine_repo::SqliteMedicineRepository;
pub use pool::{Config, Database};
