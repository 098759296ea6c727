//! User repository.

use std::sync::Arc;

use crate::entities::{
    activity, comment, poll_invitation, user, vote, Activity, Comment, PollInvitation, User, Vote,
};
use pollhub_common::{AppError, AppResult};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    Order, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use super::map_db_err;

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Get a user by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User: {id}")))
    }

    /// Find a user by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Find a user by email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// List users, newest first.
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<Vec<user::Model>> {
        User::find()
            .order_by(user::Column::CreatedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a user together with their votes, invitations and comments.
    ///
    /// Invitations the user sent and activity entries are kept with their
    /// user reference cleared.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        Vote::delete_many()
            .filter(vote::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        PollInvitation::delete_many()
            .filter(poll_invitation::Column::VoterId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        // Invitations this user sent stay valid for their voters.
        PollInvitation::update_many()
            .col_expr(
                poll_invitation::Column::InvitedById,
                Expr::value(Option::<String>::None),
            )
            .filter(poll_invitation::Column::InvitedById.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        Comment::delete_many()
            .filter(comment::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        Activity::update_many()
            .col_expr(activity::Column::UserId, Expr::value(Option::<String>::None))
            .filter(activity::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        User::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_user(id: &str, username: &str, role: UserRole) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_digest: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            role,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_username() {
        let alice = create_test_user("u1", "alice", UserRole::Organizer);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[alice.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_username("alice").await.unwrap();

        assert_eq!(result.unwrap().role, UserRole::Organizer);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_cascade_runs_every_statement() {
        let exec = || MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(), exec(), exec(), exec(), exec(), exec()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.delete_cascade("u1").await.is_ok());
    }
}
