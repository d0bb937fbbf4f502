//! Error handling utilities for repositories

use relay_core::error::DomainError;
use relay_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

pub fn message_not_found(id: Snowflake) -> DomainError {
    DomainError::MessageNotFound(id)
}
