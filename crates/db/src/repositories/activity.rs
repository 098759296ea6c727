//! Activity repository.

use std::sync::Arc;

use crate::entities::{activity, activity::ActivityType, Activity};
use pollhub_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, QuerySelect,
};

use super::map_db_err;

/// Append-only access to the activity log.
#[derive(Clone)]
pub struct ActivityRepository {
    db: Arc<DatabaseConnection>,
}

impl ActivityRepository {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn create(&self, model: activity::ActiveModel) -> AppResult<activity::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Latest entries across all users.
    pub async fn find_latest(&self, limit: u64) -> AppResult<Vec<activity::Model>> {
        Activity::find()
            .order_by(activity::Column::CreatedAt, Order::Desc)
            .order_by(activity::Column::Id, Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Latest entries attributed to a user.
    pub async fn find_by_user(&self, user_id: &str, limit: u64) -> AppResult<Vec<activity::Model>> {
        Activity::find()
            .filter(activity::Column::UserId.eq(user_id))
            .order_by(activity::Column::CreatedAt, Order::Desc)
            .order_by(activity::Column::Id, Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Latest entries of one type.
    pub async fn find_by_type(
        &self,
        activity_type: ActivityType,
        limit: u64,
    ) -> AppResult<Vec<activity::Model>> {
        Activity::find()
            .filter(activity::Column::ActivityType.eq(activity_type))
            .order_by(activity::Column::CreatedAt, Order::Desc)
            .order_by(activity::Column::Id, Order::Desc)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_activity(id: &str, kind: ActivityType) -> activity::Model {
        activity::Model {
            id: id.to_string(),
            user_id: Some("u1".to_string()),
            activity_type: kind,
            details: "Poll Lunch options created".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_type() {
        let a = create_test_activity("a1", ActivityType::PollCreated);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[a]])
                .into_connection(),
        );

        let repo = ActivityRepository::new(db);
        let result = repo.find_by_type(ActivityType::PollCreated, 10).await.unwrap();

        assert_eq!(result[0].activity_type, ActivityType::PollCreated);
        assert_eq!(result[0].user_id.as_deref(), Some("u1"));
    }
}
