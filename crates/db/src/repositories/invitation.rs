//! Poll invitation repository.

use std::sync::Arc;

use crate::entities::{
    poll_invitation::{self, InvitationStatus},
    PollInvitation,
};
use chrono::Utc;
use pollhub_common::{AppError, AppResult};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder,
};

use super::map_db_err;

/// Repository for poll invitations.
#[derive(Clone)]
pub struct InvitationRepository {
    db: Arc<DatabaseConnection>,
}

impl InvitationRepository {
    /// Create a new invitation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an invitation by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll_invitation::Model>> {
        PollInvitation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Get an invitation by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll_invitation::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invitation: {id}")))
    }

    /// Find the invitation of a voter to a poll.
    pub async fn find_by_poll_and_voter(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<poll_invitation::Model>> {
        PollInvitation::find()
            .filter(poll_invitation::Column::PollId.eq(poll_id))
            .filter(poll_invitation::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Invitations sent for a poll, oldest first.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_invitation::Model>> {
        PollInvitation::find()
            .filter(poll_invitation::Column::PollId.eq(poll_id))
            .order_by(poll_invitation::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Invitations still awaiting a voter's decision, newest first.
    pub async fn find_pending_for_voter(
        &self,
        voter_id: &str,
    ) -> AppResult<Vec<poll_invitation::Model>> {
        PollInvitation::find()
            .filter(poll_invitation::Column::VoterId.eq(voter_id))
            .filter(poll_invitation::Column::Status.eq(InvitationStatus::Pending))
            .order_by(poll_invitation::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create a new invitation.
    pub async fn create(
        &self,
        model: poll_invitation::ActiveModel,
    ) -> AppResult<poll_invitation::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Move a pending invitation to a terminal status.
    ///
    /// Only rows still `pending` are touched; returns `false` when the
    /// invitation was already decided (or no longer exists).
    pub async fn decide(&self, id: &str, status: InvitationStatus) -> AppResult<bool> {
        let result = PollInvitation::update_many()
            .col_expr(poll_invitation::Column::Status, Expr::value(status))
            .col_expr(
                poll_invitation::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .filter(poll_invitation::Column::Id.eq(id))
            .filter(poll_invitation::Column::Status.eq(InvitationStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected == 1)
    }

    /// Delete an invitation regardless of its status.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        PollInvitation::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
