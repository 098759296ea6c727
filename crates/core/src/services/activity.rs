//! Activity recorder.
//!
//! Services report each successful top-level mutation to an injected
//! [`ActivityRecorder`]. Recording is best effort: a failing recorder is
//! logged and never fails the operation that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pollhub_common::{AppResult, IdGenerator};
use pollhub_db::{
    entities::{activity, activity::ActivityType},
    repositories::ActivityRepository,
};
use sea_orm::Set;
use tracing::{debug, warn};

/// Observer of mutations, fed once per successful operation.
#[async_trait]
pub trait ActivityRecorder: Send + Sync {
    /// Record an entry.
    async fn record(
        &self,
        user_id: Option<&str>,
        activity_type: ActivityType,
        details: &str,
    ) -> AppResult<()>;
}

/// Shared recorder handle held by services.
pub type ActivityRecorderService = Arc<dyn ActivityRecorder>;

/// A recorder that drops every entry.
#[derive(Clone, Default)]
pub struct NoOpActivityRecorder;

#[async_trait]
impl ActivityRecorder for NoOpActivityRecorder {
    async fn record(
        &self,
        _user_id: Option<&str>,
        _activity_type: ActivityType,
        _details: &str,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Writes entries to the `activities` table.
#[derive(Clone)]
pub struct DbActivityRecorder {
    activity_repo: ActivityRepository,
    id_gen: IdGenerator,
}

impl DbActivityRecorder {
    /// Create a new database-backed recorder.
    #[must_use]
    pub const fn new(activity_repo: ActivityRepository) -> Self {
        Self {
            activity_repo,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl ActivityRecorder for DbActivityRecorder {
    async fn record(
        &self,
        user_id: Option<&str>,
        activity_type: ActivityType,
        details: &str,
    ) -> AppResult<()> {
        let model = activity::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.map(ToString::to_string)),
            activity_type: Set(activity_type),
            details: Set(details.to_string()),
            created_at: Set(Utc::now().into()),
        };

        self.activity_repo.create(model).await?;
        Ok(())
    }
}

/// Report to `recorder`, swallowing any failure.
pub(crate) async fn notify(
    recorder: &ActivityRecorderService,
    user_id: Option<&str>,
    activity_type: ActivityType,
    details: &str,
) {
    match recorder.record(user_id, activity_type, details).await {
        Ok(()) => debug!(activity = activity_type.as_str(), "Activity recorded"),
        Err(e) => warn!(
            error = %e,
            activity = activity_type.as_str(),
            "Failed to record activity"
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use super::*;
    use pollhub_common::AppError;
    use std::sync::Mutex;

    /// Captures entries in memory.
    #[derive(Default)]
    pub struct RecordingActivityRecorder {
        pub entries: Mutex<Vec<(Option<String>, ActivityType, String)>>,
    }

    impl RecordingActivityRecorder {
        pub fn types(&self) -> Vec<ActivityType> {
            self.entries.lock().unwrap().iter().map(|e| e.1).collect()
        }
    }

    #[async_trait]
    impl ActivityRecorder for RecordingActivityRecorder {
        async fn record(
            &self,
            user_id: Option<&str>,
            activity_type: ActivityType,
            details: &str,
        ) -> AppResult<()> {
            self.entries.lock().unwrap().push((
                user_id.map(ToString::to_string),
                activity_type,
                details.to_string(),
            ));
            Ok(())
        }
    }

    /// Fails every call.
    pub struct FailingActivityRecorder;

    #[async_trait]
    impl ActivityRecorder for FailingActivityRecorder {
        async fn record(
            &self,
            _user_id: Option<&str>,
            _activity_type: ActivityType,
            _details: &str,
        ) -> AppResult<()> {
            Err(AppError::Database("activities table unavailable".to_string()))
        }
    }
}
