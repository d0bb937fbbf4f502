//! # relay-db
//!
//! Database layer implementing the store ports with PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! - Connection pool management and schema migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - `MessageStore` and `RoomRepository` implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_db::{create_pool, run_migrations, DatabaseConfig, PgMessageStore};
//!
//! let pool = create_pool(&DatabaseConfig::from(&config.database)).await?;
//! run_migrations(&pool).await?;
//! let store = PgMessageStore::new(pool);
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, run_migrations, DatabaseConfig, PgPool, MIGRATIONS_DIR};
pub use repositories::{PgMessageStore, PgRoomRepository};
