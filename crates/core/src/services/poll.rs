//! Poll lifecycle service.
//!
//! Owns the `draft -> active -> closed` state machine and the rules for
//! changing a poll's questions and options.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use pollhub_common::{AppError, AppResult, IdGenerator, Violations};
use pollhub_db::{
    entities::{
        activity::ActivityType,
        poll::{self, PollStatus},
        poll_option, question,
        question::QuestionType,
    },
    repositories::{OptionRepository, PollRepository, QuestionRepository, VoteRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::access::{AccessEvaluator, Actor, Intent};
use crate::services::activity::{notify, ActivityRecorderService};
use crate::validation::{self, rules, Validator};

/// Default page size for poll listings.
const DEFAULT_LIST_LIMIT: u64 = 100;

/// Input for creating a poll.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePollInput {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_private: bool,
}

/// Input for updating a poll. Status is changed only through
/// [`PollService::activate`] and [`PollService::close`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePollInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_private: Option<bool>,
}

/// Input for adding a question.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestionInput {
    pub text: String,
    pub question_type: QuestionType,
}

/// Input for updating a question.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuestionInput {
    pub text: Option<String>,
    pub question_type: Option<QuestionType>,
}

/// A question with its options.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: question::Model,
    pub options: Vec<poll_option::Model>,
}

/// A poll with its questions and options.
#[derive(Debug, Clone, Serialize)]
pub struct PollDetail {
    #[serde(flatten)]
    pub poll: poll::Model,
    pub questions: Vec<QuestionDetail>,
}

/// Tally of one option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionResult {
    pub option_id: String,
    pub text: String,
    pub votes: i64,
    /// Share of the question's votes, rounded to two decimals.
    pub percentage: f64,
}

/// Tally of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub text: String,
    pub question_type: QuestionType,
    pub total_votes: i64,
    pub options: Vec<OptionResult>,
}

/// Results of a poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollResults {
    pub poll_id: String,
    pub status: PollStatus,
    pub questions: Vec<QuestionResult>,
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    question_repo: QuestionRepository,
    option_repo: OptionRepository,
    vote_repo: VoteRepository,
    access: AccessEvaluator,
    validator: Validator,
    recorder: ActivityRecorderService,
    strict_question_lock: bool,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service. Questions and options are locked once a
    /// poll leaves `draft`; see [`Self::with_strict_question_lock`].
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        question_repo: QuestionRepository,
        option_repo: OptionRepository,
        vote_repo: VoteRepository,
        access: AccessEvaluator,
        validator: Validator,
        recorder: ActivityRecorderService,
    ) -> Self {
        Self {
            poll_repo,
            question_repo,
            option_repo,
            vote_repo,
            access,
            validator,
            recorder,
            strict_question_lock: true,
            id_gen: IdGenerator::new(),
        }
    }

    /// When `false`, questions and options of active polls may change too.
    #[must_use]
    pub const fn with_strict_question_lock(mut self, strict: bool) -> Self {
        self.strict_question_lock = strict;
        self
    }

    /// Create a draft poll owned by `actor`.
    pub async fn create(&self, actor: &Actor, input: CreatePollInput) -> AppResult<poll::Model> {
        if !actor.role.can_organize() {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }

        let mut violations = Violations::new();
        validation::check_poll_attributes(
            &mut violations,
            &input.title,
            &input.description,
            input.start_date,
            input.end_date,
            today(),
            false,
        );
        self.validator
            .require_user(&mut violations, "organizer_id", &actor.id)
            .await?;
        violations.into_result()?;

        let now = Utc::now();
        let model = poll::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            description: Set(input.description),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            status: Set(PollStatus::Draft),
            organizer_id: Set(actor.id.clone()),
            is_private: Set(input.is_private),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let poll = self.poll_repo.create(model).await?;
        info!(poll_id = %poll.id, organizer_id = %poll.organizer_id, "Poll created");

        notify(
            &self.recorder,
            Some(&actor.id),
            ActivityType::PollCreated,
            &format!("Poll {} ({}) created", poll.title, poll.id),
        )
        .await;

        Ok(poll)
    }

    /// Update a poll's attributes.
    pub async fn update(
        &self,
        actor: &Actor,
        poll_id: &str,
        input: UpdatePollInput,
    ) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::Modify).await?;

        if poll.status == PollStatus::Closed {
            return Err(AppError::State("closed polls cannot be changed".to_string()));
        }

        let title = input.title.unwrap_or_else(|| poll.title.clone());
        let description = input.description.unwrap_or_else(|| poll.description.clone());
        let start_date = input.start_date.unwrap_or(poll.start_date);
        let end_date = input.end_date.unwrap_or(poll.end_date);
        let is_private = input.is_private.unwrap_or(poll.is_private);

        let mut violations = Violations::new();
        validation::check_poll_attributes(
            &mut violations,
            &title,
            &description,
            start_date,
            end_date,
            today(),
            poll.status == PollStatus::Active,
        );
        violations.into_result()?;

        let mut active: poll::ActiveModel = poll.into();
        active.title = Set(title);
        active.description = Set(description);
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        active.is_private = Set(is_private);
        active.updated_at = Set(Some(Utc::now().into()));

        let poll = self.poll_repo.update(active).await?;
        self.notify_updated(actor, &poll).await;
        Ok(poll)
    }

    /// Open a draft poll for voting.
    pub async fn activate(&self, actor: &Actor, poll_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::Modify).await?;

        if poll.status != PollStatus::Draft {
            return Err(AppError::State(format!(
                "only draft polls can be activated (poll is {})",
                poll.status.as_str()
            )));
        }

        let mut violations = Violations::new();
        validation::dates::check_poll_dates(
            &mut violations,
            poll.start_date,
            poll.end_date,
            today(),
            true,
        );
        violations.into_result()?;

        self.transition(actor, poll, PollStatus::Active).await
    }

    /// Freeze voting on an active poll.
    pub async fn close(&self, actor: &Actor, poll_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::Modify).await?;

        if poll.status != PollStatus::Active {
            return Err(AppError::State(format!(
                "only active polls can be closed (poll is {})",
                poll.status.as_str()
            )));
        }

        self.transition(actor, poll, PollStatus::Closed).await
    }

    async fn transition(
        &self,
        actor: &Actor,
        poll: poll::Model,
        to: PollStatus,
    ) -> AppResult<poll::Model> {
        let from = poll.status;
        let mut active: poll::ActiveModel = poll.into();
        active.status = Set(to);
        active.updated_at = Set(Some(Utc::now().into()));

        let poll = self.poll_repo.update(active).await?;
        info!(
            poll_id = %poll.id,
            from = from.as_str(),
            to = to.as_str(),
            "Poll status changed"
        );

        self.notify_updated(actor, &poll).await;
        Ok(poll)
    }

    async fn notify_updated(&self, actor: &Actor, poll: &poll::Model) {
        notify(
            &self.recorder,
            Some(&actor.id),
            ActivityType::PollUpdated,
            &format!("Poll {} ({}) updated", poll.title, poll.id),
        )
        .await;
    }

    /// Delete a poll with everything it owns.
    pub async fn delete(&self, actor: &Actor, poll_id: &str) -> AppResult<()> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::Modify).await?;

        self.poll_repo.delete_cascade(&poll.id).await?;
        info!(poll_id = %poll.id, actor_id = %actor.id, "Poll deleted");
        Ok(())
    }

    /// Get a poll with its questions and options.
    pub async fn get(&self, actor: &Actor, poll_id: &str) -> AppResult<PollDetail> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::View).await?;

        let questions = self.question_repo.find_by_poll(&poll.id).await?;
        let options = self
            .option_repo
            .find_by_questions(questions.iter().map(|q| q.id.clone()).collect())
            .await?;

        let mut by_question: HashMap<String, Vec<poll_option::Model>> = HashMap::new();
        for option in options {
            by_question
                .entry(option.question_id.clone())
                .or_default()
                .push(option);
        }

        let questions = questions
            .into_iter()
            .map(|question| QuestionDetail {
                options: by_question.remove(&question.id).unwrap_or_default(),
                question,
            })
            .collect();

        Ok(PollDetail { poll, questions })
    }

    /// Polls the actor may view, newest first.
    pub async fn list(&self, actor: &Actor, limit: Option<u64>, offset: u64) -> AppResult<Vec<poll::Model>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if actor.role.can_organize() {
            self.poll_repo.find_all(limit, offset).await
        } else {
            self.poll_repo
                .find_visible_to_voter(&actor.id, limit, offset)
                .await
        }
    }

    /// Vote counts and percentages per option.
    pub async fn results(&self, actor: &Actor, poll_id: &str) -> AppResult<PollResults> {
        let detail = self.get(actor, poll_id).await?;
        let tallies = self
            .vote_repo
            .tally(detail.questions.iter().map(|q| q.question.id.clone()).collect())
            .await?;

        let votes_for = |option_id: &str| {
            tallies
                .iter()
                .find(|t| t.option_id == option_id)
                .map_or(0, |t| t.votes)
        };

        let questions = detail
            .questions
            .into_iter()
            .map(|q| {
                let counts: Vec<(poll_option::Model, i64)> = q
                    .options
                    .into_iter()
                    .map(|o| {
                        let n = votes_for(&o.id);
                        (o, n)
                    })
                    .collect();
                let total: i64 = counts.iter().map(|(_, n)| n).sum();

                QuestionResult {
                    question_id: q.question.id,
                    text: q.question.text,
                    question_type: q.question.question_type,
                    total_votes: total,
                    options: counts
                        .into_iter()
                        .map(|(o, n)| OptionResult {
                            option_id: o.id,
                            text: o.text,
                            votes: n,
                            percentage: percentage(n, total),
                        })
                        .collect(),
                }
            })
            .collect();

        Ok(PollResults {
            poll_id: detail.poll.id,
            status: detail.poll.status,
            questions,
        })
    }

    // === Questions ===

    /// Add a question to a poll.
    pub async fn add_question(
        &self,
        actor: &Actor,
        poll_id: &str,
        input: CreateQuestionInput,
    ) -> AppResult<question::Model> {
        let poll = self.editable_poll(actor, poll_id).await?;

        let mut violations = Violations::new();
        rules::check_question_text(&mut violations, &input.text);
        violations.into_result()?;

        let now = Utc::now();
        let model = question::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll.id),
            text: Set(input.text),
            question_type: Set(input.question_type),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let question = self.question_repo.create(model).await?;
        info!(question_id = %question.id, poll_id = %question.poll_id, "Question added");
        Ok(question)
    }

    /// Change a question's text or type.
    pub async fn update_question(
        &self,
        actor: &Actor,
        question_id: &str,
        input: UpdateQuestionInput,
    ) -> AppResult<question::Model> {
        let question = self.question_repo.get_by_id(question_id).await?;
        self.editable_poll(actor, &question.poll_id).await?;

        let mut violations = Violations::new();
        if let Some(text) = &input.text {
            rules::check_question_text(&mut violations, text);
        }
        violations.into_result()?;

        if let Some(kind) = input.question_type
            && kind != question.question_type
            && self.vote_repo.count_by_question(&question.id).await? > 0
        {
            return Err(AppError::State(
                "question type cannot change once votes exist".to_string(),
            ));
        }

        let mut active: question::ActiveModel = question.into();
        if let Some(text) = input.text {
            active.text = Set(text);
        }
        if let Some(kind) = input.question_type {
            active.question_type = Set(kind);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.question_repo.update(active).await
    }

    /// Remove a question with its options and votes.
    pub async fn delete_question(&self, actor: &Actor, question_id: &str) -> AppResult<()> {
        let question = self.question_repo.get_by_id(question_id).await?;
        self.editable_poll(actor, &question.poll_id).await?;

        self.question_repo.delete_cascade(&question.id).await?;
        info!(question_id = %question.id, "Question deleted");
        Ok(())
    }

    // === Options ===

    /// Add an option to a question.
    pub async fn add_option(
        &self,
        actor: &Actor,
        question_id: &str,
        text: &str,
    ) -> AppResult<poll_option::Model> {
        let question = self.question_repo.get_by_id(question_id).await?;
        self.editable_poll(actor, &question.poll_id).await?;

        let mut violations = Violations::new();
        rules::check_option_text(&mut violations, text);
        self.validator
            .check_option_text_unique(&mut violations, &question.id, text, None)
            .await?;
        violations.into_result()?;

        let model = poll_option::ActiveModel {
            id: Set(self.id_gen.generate()),
            question_id: Set(question.id),
            text: Set(text.trim().to_string()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.option_repo.create(model).await
    }

    /// Rename an option.
    pub async fn update_option(
        &self,
        actor: &Actor,
        option_id: &str,
        text: &str,
    ) -> AppResult<poll_option::Model> {
        let option = self.option_repo.get_by_id(option_id).await?;
        let question = self.question_repo.get_by_id(&option.question_id).await?;
        self.editable_poll(actor, &question.poll_id).await?;

        let mut violations = Violations::new();
        rules::check_option_text(&mut violations, text);
        self.validator
            .check_option_text_unique(&mut violations, &question.id, text, Some(&option.id))
            .await?;
        violations.into_result()?;

        let mut active: poll_option::ActiveModel = option.into();
        active.text = Set(text.trim().to_string());
        active.updated_at = Set(Some(Utc::now().into()));

        self.option_repo.update(active).await
    }

    /// Remove an option and its votes.
    pub async fn delete_option(&self, actor: &Actor, option_id: &str) -> AppResult<()> {
        let option = self.option_repo.get_by_id(option_id).await?;
        let question = self.question_repo.get_by_id(&option.question_id).await?;
        self.editable_poll(actor, &question.poll_id).await?;

        self.option_repo.delete_cascade(&option.id).await
    }

    /// Load a poll the actor may modify and whose structure is editable.
    async fn editable_poll(&self, actor: &Actor, poll_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::Modify).await?;

        let mut violations = Violations::new();
        validation::check_poll_editable(&mut violations, &poll, self.strict_question_lock);
        violations.into_result()?;

        Ok(poll)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `part` as a percentage of `total`, rounded to two decimals.
fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / total as f64).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::activity::testing::RecordingActivityRecorder;
    use pollhub_db::{
        entities::{poll_invitation, user::UserRole},
        repositories::{InvitationRepository, UserRepository},
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn create_test_poll(status: PollStatus) -> poll::Model {
        let today = today();
        poll::Model {
            id: "p1".to_string(),
            title: "Team offsite".to_string(),
            description: "Pick a venue for the offsite".to_string(),
            start_date: today,
            end_date: today + chrono::Duration::days(7),
            status,
            organizer_id: "org1".to_string(),
            is_private: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: DatabaseConnection, recorder: ActivityRecorderService) -> PollService {
        let db = Arc::new(db);
        PollService::new(
            PollRepository::new(db.clone()),
            QuestionRepository::new(db.clone()),
            OptionRepository::new(db.clone()),
            VoteRepository::new(db.clone()),
            AccessEvaluator::new(InvitationRepository::new(db.clone())),
            Validator::new(
                UserRepository::new(db.clone()),
                OptionRepository::new(db.clone()),
                InvitationRepository::new(db),
            ),
            recorder,
        )
    }

    fn organizer() -> Actor {
        Actor::new("org1", UserRole::Organizer)
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[tokio::test]
    async fn test_create_rejects_voter() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let result = svc
            .create(
                &Actor::new("v1", UserRole::Voter),
                CreatePollInput {
                    title: "Lunch".to_string(),
                    description: "Where should we eat".to_string(),
                    start_date: today(),
                    end_date: today() + chrono::Duration::days(1),
                    is_private: false,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(recorder.types().is_empty());
    }

    #[tokio::test]
    async fn test_create_invalid_writes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<pollhub_db::entities::user::Model>::new()])
            .into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let result = svc
            .create(
                &organizer(),
                CreatePollInput {
                    title: "<b>".to_string(),
                    description: "short".to_string(),
                    start_date: today(),
                    end_date: today(),
                    is_private: false,
                },
            )
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.error_code(), "REFERENCE_ERROR");
        assert!(recorder.types().is_empty());
    }

    #[tokio::test]
    async fn test_activate_requires_draft() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_poll(PollStatus::Active)]])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let result = svc.activate(&organizer(), "p1").await;
        assert!(matches!(result, Err(AppError::State(_))));
    }

    #[tokio::test]
    async fn test_close_rejects_draft_and_closed() {
        for status in [PollStatus::Draft, PollStatus::Closed] {
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_poll(status)]])
                .into_connection();
            let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

            let result = svc.close(&organizer(), "p1").await;
            assert!(matches!(result, Err(AppError::State(_))), "{status:?}");
        }
    }

    #[tokio::test]
    async fn test_close_active_records_update() {
        let active = create_test_poll(PollStatus::Active);
        let mut closed = active.clone();
        closed.status = PollStatus::Closed;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[active]])
            .append_query_results([[closed]])
            .into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let poll = svc.close(&organizer(), "p1").await.unwrap();

        assert_eq!(poll.status, PollStatus::Closed);
        assert_eq!(recorder.types(), vec![ActivityType::PollUpdated]);
        assert_eq!(
            recorder.entries.lock().unwrap()[0].2,
            "Poll Team offsite (p1) updated"
        );
    }

    #[tokio::test]
    async fn test_other_organizer_cannot_modify() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_poll(PollStatus::Draft)]])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let result = svc
            .activate(&Actor::new("org2", UserRole::Organizer), "p1")
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_add_question_to_closed_poll_is_state_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_poll(PollStatus::Closed)]])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()))
            .with_strict_question_lock(false);

        let result = svc
            .add_question(
                &organizer(),
                "p1",
                CreateQuestionInput {
                    text: "Which venue?".to_string(),
                    question_type: QuestionType::SingleChoice,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::State(_))));
    }

    #[tokio::test]
    async fn test_private_poll_hidden_from_uninvited_voter() {
        let mut poll = create_test_poll(PollStatus::Active);
        poll.is_private = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([Vec::<poll_invitation::Model>::new()])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let result = svc.get(&Actor::new("v1", UserRole::Voter), "p1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
