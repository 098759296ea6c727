//! Comment service.

use chrono::Utc;
use pollhub_common::{AppError, AppResult, IdGenerator, Violations};
use pollhub_db::{
    entities::{activity::ActivityType, comment},
    repositories::{CommentRepository, PollRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;

use crate::access::{AccessEvaluator, Actor, Intent};
use crate::services::activity::{notify, ActivityRecorderService};
use crate::validation::{rules, Validator};

const DEFAULT_LIST_LIMIT: u64 = 50;

/// Input for commenting on a poll.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub poll_id: String,
    pub content: String,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    poll_repo: PollRepository,
    access: AccessEvaluator,
    validator: Validator,
    recorder: ActivityRecorderService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        poll_repo: PollRepository,
        access: AccessEvaluator,
        validator: Validator,
        recorder: ActivityRecorderService,
    ) -> Self {
        Self {
            comment_repo,
            poll_repo,
            access,
            validator,
            recorder,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comment on a poll.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        let poll = self.poll_repo.get_by_id(&input.poll_id).await?;
        self.access.ensure(actor, &poll, Intent::View).await?;

        let mut violations = Violations::new();
        rules::check_comment_content(&mut violations, &input.content);
        self.validator
            .check_can_comment(&mut violations, actor, &poll)
            .await?;
        violations.into_result()?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(actor.id.clone()),
            poll_id: Set(poll.id.clone()),
            content: Set(input.content.trim().to_string()),
            created_at: Set(Utc::now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        info!(comment_id = %comment.id, poll_id = %poll.id, user_id = %actor.id, "Comment created");

        notify(
            &self.recorder,
            Some(&actor.id),
            ActivityType::CommentCreated,
            &format!("Comment added to poll: {}", poll.title),
        )
        .await;

        Ok(comment)
    }

    /// Delete a comment. Only its author or an admin may.
    pub async fn delete(&self, actor: &Actor, comment_id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if comment.user_id != actor.id && !actor.is_admin() {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }

        self.comment_repo.delete(comment_id).await?;
        info!(comment_id, poll_id = %comment.poll_id, "Comment deleted");
        Ok(())
    }

    /// Comments on a poll, newest first.
    pub async fn list(
        &self,
        actor: &Actor,
        poll_id: &str,
        limit: Option<u64>,
        offset: u64,
    ) -> AppResult<Vec<comment::Model>> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::View).await?;

        self.comment_repo
            .find_by_poll(&poll.id, limit.unwrap_or(DEFAULT_LIST_LIMIT), offset)
            .await
    }
}
