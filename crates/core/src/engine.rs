//! Wiring of repositories and services over one connection.

use std::sync::Arc;

use pollhub_common::{AppResult, EngineConfig};
use pollhub_db::{
    entities::activity::{self, ActivityType},
    repositories::{
        ActivityRepository, CommentRepository, InvitationRepository, OptionRepository,
        PollRepository, QuestionRepository, UserRepository, VoteRepository,
    },
};
use sea_orm::DatabaseConnection;

use crate::access::AccessEvaluator;
use crate::services::{
    ActivityRecorderService, CommentService, DbActivityRecorder, InvitationService, PollService,
    UserService, VoteService,
};
use crate::validation::Validator;

/// The poll engine: every service, sharing one connection and one recorder.
#[derive(Clone)]
pub struct Engine {
    pub polls: PollService,
    pub votes: VoteService,
    pub invitations: InvitationService,
    pub comments: CommentService,
    pub users: UserService,
    pub access: AccessEvaluator,
    activity_repo: ActivityRepository,
}

impl Engine {
    /// Build the engine, reporting mutations to `recorder`.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &EngineConfig,
        recorder: ActivityRecorderService,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let poll_repo = PollRepository::new(Arc::clone(&db));
        let question_repo = QuestionRepository::new(Arc::clone(&db));
        let option_repo = OptionRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));
        let invitation_repo = InvitationRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let activity_repo = ActivityRepository::new(db);

        let access = AccessEvaluator::new(invitation_repo.clone());
        let validator = Validator::new(
            user_repo.clone(),
            option_repo.clone(),
            invitation_repo.clone(),
        );

        let polls = PollService::new(
            poll_repo.clone(),
            question_repo.clone(),
            option_repo.clone(),
            vote_repo.clone(),
            access.clone(),
            validator.clone(),
            Arc::clone(&recorder),
        )
        .with_strict_question_lock(config.strict_question_lock);

        let votes = VoteService::new(
            poll_repo.clone(),
            question_repo,
            option_repo,
            vote_repo,
            access.clone(),
            Arc::clone(&recorder),
        );

        let invitations = InvitationService::new(
            invitation_repo,
            poll_repo.clone(),
            access.clone(),
            validator.clone(),
        );

        let comments = CommentService::new(
            comment_repo,
            poll_repo.clone(),
            access.clone(),
            validator,
            Arc::clone(&recorder),
        );

        let users = UserService::new(user_repo, poll_repo, recorder);

        Self {
            polls,
            votes,
            invitations,
            comments,
            users,
            access,
            activity_repo,
        }
    }

    /// Build the engine with activity entries written to the database.
    #[must_use]
    pub fn with_db_recorder(db: Arc<DatabaseConnection>, config: &EngineConfig) -> Self {
        let recorder = Arc::new(DbActivityRecorder::new(ActivityRepository::new(
            Arc::clone(&db),
        )));
        Self::new(db, config, recorder)
    }

    /// Most recent activity entries.
    pub async fn latest_activity(&self, limit: u64) -> AppResult<Vec<activity::Model>> {
        self.activity_repo.find_latest(limit).await
    }

    /// Activity entries of one user, newest first.
    pub async fn activity_of_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<activity::Model>> {
        self.activity_repo.find_by_user(user_id, limit).await
    }

    /// Activity entries of one type, newest first.
    pub async fn activity_of_type(
        &self,
        activity_type: ActivityType,
        limit: u64,
    ) -> AppResult<Vec<activity::Model>> {
        self.activity_repo.find_by_type(activity_type, limit).await
    }
}
