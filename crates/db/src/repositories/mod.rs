//! Repositories: typed access to each table.

pub mod activity;
pub mod comment;
pub mod invitation;
pub mod poll;
pub mod poll_option;
pub mod question;
pub mod user;
pub mod vote;

pub use activity::ActivityRepository;
pub use comment::CommentRepository;
pub use invitation::InvitationRepository;
pub use poll::PollRepository;
pub use poll_option::OptionRepository;
pub use question::QuestionRepository;
pub use user::UserRepository;
pub use vote::{OptionTally, VoteRepository};

use pollhub_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Translate a storage error into the engine's error taxonomy.
///
/// Constraint violations surface as client errors so a race lost at the
/// storage layer reads the same as one caught by validation.
#[must_use]
pub fn map_db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Uniqueness(detail),
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => AppError::Reference(detail),
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_db_err_falls_back_to_database() {
        let err = map_db_err(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, AppError::Database(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_map_db_err_record_not_found() {
        let err = map_db_err(DbErr::RecordNotFound("poll".to_string()));
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
