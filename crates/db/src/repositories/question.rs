//! Question repository.

use std::sync::Arc;

use crate::entities::{poll_option, question, vote, PollOption, Question, Vote};
use pollhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::map_db_err;

/// Question repository for database operations.
#[derive(Clone)]
pub struct QuestionRepository {
    db: Arc<DatabaseConnection>,
}

impl QuestionRepository {
    /// Create a new question repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a question by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<question::Model>> {
        Question::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Get a question by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<question::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question: {id}")))
    }

    /// Questions of a poll in creation order.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<question::Model>> {
        Question::find()
            .filter(question::Column::PollId.eq(poll_id))
            .order_by(question::Column::CreatedAt, Order::Asc)
            .order_by(question::Column::Id, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create a new question.
    pub async fn create(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update a question.
    pub async fn update(&self, model: question::ActiveModel) -> AppResult<question::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete a question with its options and votes.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        Vote::delete_many()
            .filter(vote::Column::QuestionId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        PollOption::delete_many()
            .filter(poll_option::Column::QuestionId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        Question::delete_by_id(id)
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
    use crate::entities::question::QuestionType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_question(id: &str, poll_id: &str, kind: QuestionType) -> question::Model {
        question::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            text: "Which day works best".to_string(),
            question_type: kind,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_poll() {
        let q1 = create_test_question("q1", "p1", QuestionType::SingleChoice);
        let q2 = create_test_question("q2", "p1", QuestionType::MultipleChoice);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[q1, q2]])
                .into_connection(),
        );

        let repo = QuestionRepository::new(db);
        let result = repo.find_by_poll("p1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].question_type, QuestionType::MultipleChoice);
    }
}
