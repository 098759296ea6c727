//! Poll repository.

use std::sync::Arc;

use crate::entities::{
    comment, poll, poll_invitation, poll_invitation::InvitationStatus, poll_option, question,
    vote, Comment, Poll, PollInvitation, PollOption, Question, Vote,
};
use pollhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use super::map_db_err;

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll: {id}")))
    }

    /// Create a new poll.
    pub async fn create(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// List every poll, newest first.
    pub async fn find_all(&self, limit: u64, offset: u64) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .order_by(poll::Column::CreatedAt, Order::Desc)
            .order_by(poll::Column::Id, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// List polls a voter may see: public ones plus private ones with an
    /// accepted invitation for that voter.
    pub async fn find_visible_to_voter(
        &self,
        voter_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<poll::Model>> {
        let accepted: Vec<String> = PollInvitation::find()
            .filter(poll_invitation::Column::VoterId.eq(voter_id))
            .filter(poll_invitation::Column::Status.eq(InvitationStatus::Accepted))
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|i| i.poll_id)
            .collect();

        let mut visible = Condition::any().add(poll::Column::IsPrivate.eq(false));
        if !accepted.is_empty() {
            visible = visible.add(poll::Column::Id.is_in(accepted));
        }

        Poll::find()
            .filter(visible)
            .order_by(poll::Column::CreatedAt, Order::Desc)
            .order_by(poll::Column::Id, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Count polls organized by a user.
    pub async fn count_by_organizer(&self, organizer_id: &str) -> AppResult<u64> {
        Poll::find()
            .filter(poll::Column::OrganizerId.eq(organizer_id))
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Delete a poll and every row that belongs to it, in one transaction.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let question_ids: Vec<String> = Question::find()
            .select_only()
            .column(question::Column::Id)
            .filter(question::Column::PollId.eq(id))
            .into_tuple()
            .all(&txn)
            .await
            .map_err(map_db_err)?;

        if !question_ids.is_empty() {
            Vote::delete_many()
                .filter(vote::Column::QuestionId.is_in(question_ids.clone()))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;

            PollOption::delete_many()
                .filter(poll_option::Column::QuestionId.is_in(question_ids))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;

            Question::delete_many()
                .filter(question::Column::PollId.eq(id))
                .exec(&txn)
                .await
                .map_err(map_db_err)?;
        }

        Comment::delete_many()
            .filter(comment::Column::PollId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        PollInvitation::delete_many()
            .filter(poll_invitation::Column::PollId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        Poll::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)
    }
}
