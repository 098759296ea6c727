//! Option repository.

use std::sync::Arc;

use crate::entities::{poll_option, vote, PollOption, Vote};
use pollhub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::map_db_err;

/// Repository for the answer options of questions.
#[derive(Clone)]
pub struct OptionRepository {
    db: Arc<DatabaseConnection>,
}

impl OptionRepository {
    /// Create a new option repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an option by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll_option::Model>> {
        PollOption::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Get an option by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll_option::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Option: {id}")))
    }

    /// Options of a question in creation order.
    pub async fn find_by_question(&self, question_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::QuestionId.eq(question_id))
            .order_by(poll_option::Column::CreatedAt, Order::Asc)
            .order_by(poll_option::Column::Id, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Options of several questions at once.
    pub async fn find_by_questions(
        &self,
        question_ids: Vec<String>,
    ) -> AppResult<Vec<poll_option::Model>> {
        if question_ids.is_empty() {
            return Ok(vec![]);
        }

        PollOption::find()
            .filter(poll_option::Column::QuestionId.is_in(question_ids))
            .order_by(poll_option::Column::CreatedAt, Order::Asc)
            .order_by(poll_option::Column::Id, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create a new option.
    pub async fn create(&self, model: poll_option::ActiveModel) -> AppResult<poll_option::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Update an option.
    pub async fn update(&self, model: poll_option::ActiveModel) -> AppResult<poll_option::Model> {
        model.update(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Delete an option and the votes cast for it.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        Vote::delete_many()
            .filter(vote::Column::OptionId.eq(id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;

        PollOption::delete_by_id(id)
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
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_option(id: &str, question_id: &str, text: &str) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            question_id: question_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_questions_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = OptionRepository::new(db);
        let result = repo.find_by_questions(vec![]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_question() {
        let a = create_test_option("o1", "q1", "Monday");
        let b = create_test_option("o2", "q1", "Tuesday");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[a, b]])
                .into_connection(),
        );

        let repo = OptionRepository::new(db);
        let result = repo.find_by_question("q1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].text, "Monday");
    }
}
