//! # Storage Module
//!
//! Persistence for codes, stories, discount ledger entries and the
//! organizations, goals and users they refer to.
//!
//! ## Current Implementation
//!
//! - **Primary Storage**: SQLite via SQLx, one pool per process
//! - **Transactions**: repositories take `&mut SqliteConnection`, so a service
//!   can run several repository calls inside one `sqlx::Transaction`
//! - **Atomic transitions**: code consumption and ledger decay are single
//!   conditional UPDATEs decided by the affected-row count
//!
//! ## Design Principles
//!
//! - **Repository Pattern**: Clean separation between domain and data access
//! - **Testability**: every test runs against its own in-memory database

pub mod connection;
pub mod repositories;
#[cfg(test)]
pub mod test_utils;

// Re-export the main types that other modules need
pub use connection::DbConnection;
pub use repositories::{
    CodeRepository, DiscountRepository, OrganizationRepository, StoryRepository, UserRepository,
};
