//! Vote repository.

use std::sync::Arc;

use crate::entities::{vote, Vote};
use pollhub_common::AppResult;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use serde::Serialize;

use super::map_db_err;

/// Number of votes cast for one option.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize)]
pub struct OptionTally {
    /// Option the votes were cast for.
    pub option_id: String,
    /// Vote count.
    pub votes: i64,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's vote for an option.
    pub async fn find_by_user_and_option(
        &self,
        user_id: &str,
        option_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::OptionId.eq(option_id))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// A user's votes on a question.
    pub async fn find_by_user_and_question(
        &self,
        user_id: &str,
        question_id: &str,
    ) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::QuestionId.eq(question_id))
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Count votes on a question.
    pub async fn count_by_question(&self, question_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::QuestionId.eq(question_id))
            .count(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Insert a vote.
    ///
    /// A duplicate `(user, option)` or a second single-choice row for the
    /// same question fails with `AppError::Uniqueness`.
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Replace a user's single-choice vote on a question.
    ///
    /// The delete and the insert commit together; no reader ever sees zero
    /// or two rows for the pair mid-way.
    pub async fn replace_single_choice(
        &self,
        user_id: &str,
        question_id: &str,
        model: vote::ActiveModel,
    ) -> AppResult<vote::Model> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        Vote::delete_many()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::QuestionId.eq(question_id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        let inserted = model.insert(&txn).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(inserted)
    }

    /// Vote counts per option for the given questions. Options without
    /// votes are absent.
    pub async fn tally(&self, question_ids: Vec<String>) -> AppResult<Vec<OptionTally>> {
        if question_ids.is_empty() {
            return Ok(vec![]);
        }

        Vote::find()
            .select_only()
            .column(vote::Column::OptionId)
            .column_as(Expr::col(vote::Column::Id).count(), "votes")
            .filter(vote::Column::QuestionId.is_in(question_ids))
            .group_by(vote::Column::OptionId)
            .into_model::<OptionTally>()
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }
}
