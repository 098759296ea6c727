//! Vote ledger.
//!
//! Casting is validated as a whole before anything is written. After that,
//! each question is processed on its own: a failure on one question leaves
//! the votes already written for earlier questions in place.

use std::collections::BTreeMap;

use chrono::Utc;
use pollhub_common::{AppError, AppResult, IdGenerator, ViolationKind, Violations};
use pollhub_db::{
    entities::{activity::ActivityType, poll::PollStatus, question, question::QuestionType, vote},
    repositories::{OptionRepository, PollRepository, QuestionRepository, VoteRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::access::{AccessEvaluator, Actor, Intent};
use crate::services::activity::{notify, ActivityRecorderService};
use crate::validation;

/// The choice made on one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    /// Single-choice: one option ID. `None`, an empty string or `"0"`
    /// means no option was picked.
    Single(Option<String>),
    /// Multiple-choice: option ID to selected flag.
    Multiple(BTreeMap<String, bool>),
}

impl Selection {
    /// Pick a single option.
    #[must_use]
    pub fn single(option_id: impl Into<String>) -> Self {
        Self::Single(Some(option_id.into()))
    }

    /// Flag several options as selected.
    #[must_use]
    pub fn multiple<I, S>(option_ids: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self::Multiple(
            option_ids
                .into_iter()
                .map(|(id, selected)| (id.into(), selected))
                .collect(),
        )
    }

    /// The option picked on a single-choice question, if any.
    #[must_use]
    pub fn chosen_single(&self) -> Option<&str> {
        match self {
            Self::Single(Some(id)) => {
                let id = id.trim();
                (!id.is_empty() && id != "0").then_some(id)
            }
            _ => None,
        }
    }

    /// Options flagged as selected on a multiple-choice question.
    pub fn chosen_multiple(&self) -> impl Iterator<Item = &str> {
        let flags = match self {
            Self::Multiple(flags) => Some(flags),
            Self::Single(_) => None,
        };
        flags
            .into_iter()
            .flatten()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| id.as_str())
    }
}

/// Selections keyed by question ID.
pub type Selections = BTreeMap<String, Selection>;

/// One vote row written by a cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastVote {
    pub question_id: String,
    pub option_id: String,
    pub question_type: QuestionType,
}

/// Outcome of [`VoteService::cast_votes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    /// Number of vote rows written.
    pub cast: usize,
    pub votes: Vec<CastVote>,
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    poll_repo: PollRepository,
    question_repo: QuestionRepository,
    option_repo: OptionRepository,
    vote_repo: VoteRepository,
    access: AccessEvaluator,
    recorder: ActivityRecorderService,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        question_repo: QuestionRepository,
        option_repo: OptionRepository,
        vote_repo: VoteRepository,
        access: AccessEvaluator,
        recorder: ActivityRecorderService,
    ) -> Self {
        Self {
            poll_repo,
            question_repo,
            option_repo,
            vote_repo,
            access,
            recorder,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast the actor's votes on an active poll.
    ///
    /// Single-choice selections replace any earlier vote on the question.
    /// Multiple-choice selections only add votes; options already voted
    /// for, and options not flagged, are left alone.
    pub async fn cast_votes(
        &self,
        actor: &Actor,
        poll_id: &str,
        selections: &Selections,
    ) -> AppResult<VoteReceipt> {
        if selections.is_empty() {
            return Err(AppError::invalid(
                "selections",
                ViolationKind::Required,
                "no selection",
            ));
        }

        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::View).await?;

        if poll.status != PollStatus::Active {
            return Err(AppError::State(format!(
                "voting is only possible on active polls (poll is {})",
                poll.status.as_str()
            )));
        }

        let questions = self.question_repo.find_by_poll(&poll.id).await?;
        let options = self
            .option_repo
            .find_by_questions(questions.iter().map(|q| q.id.clone()).collect())
            .await?;

        let mut violations = Violations::new();
        validation::check_selections(&mut violations, selections, &questions, &options);
        violations.into_result()?;

        let mut receipt = VoteReceipt::default();
        let mut failure = None;

        for (question_id, selection) in selections {
            let Some(question) = questions.iter().find(|q| &q.id == question_id) else {
                continue;
            };

            let outcome = match question.question_type {
                QuestionType::SingleChoice => self.cast_single(actor, question, selection).await,
                QuestionType::MultipleChoice => {
                    self.cast_multiple(actor, question, selection).await
                }
            };

            match outcome {
                Ok(votes) => receipt.votes.extend(votes),
                Err(e) => {
                    warn!(
                        error = %e,
                        question_id = %question.id,
                        user_id = %actor.id,
                        "Vote on question failed"
                    );
                    // Questions are independent; report the first failure.
                    failure.get_or_insert(e);
                }
            }
        }

        receipt.cast = receipt.votes.len();

        if receipt.cast > 0 {
            info!(poll_id = %poll.id, user_id = %actor.id, cast = receipt.cast, "Votes cast");
            notify(
                &self.recorder,
                Some(&actor.id),
                ActivityType::VoteCast,
                &format!("Vote cast for poll: {}", poll.title),
            )
            .await;
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(receipt),
        }
    }

    async fn cast_single(
        &self,
        actor: &Actor,
        question: &question::Model,
        selection: &Selection,
    ) -> AppResult<Vec<CastVote>> {
        let Some(option_id) = selection.chosen_single() else {
            debug!(question_id = %question.id, "Empty selection skipped");
            return Ok(vec![]);
        };

        let existing = self
            .vote_repo
            .find_by_user_and_question(&actor.id, &question.id)
            .await?;
        if existing.len() == 1 && existing[0].option_id == option_id {
            debug!(question_id = %question.id, option_id, "Unchanged vote skipped");
            return Ok(vec![]);
        }

        let model = self.new_vote(actor, question, option_id);
        self.vote_repo
            .replace_single_choice(&actor.id, &question.id, model)
            .await?;

        Ok(vec![cast_vote(question, option_id)])
    }

    async fn cast_multiple(
        &self,
        actor: &Actor,
        question: &question::Model,
        selection: &Selection,
    ) -> AppResult<Vec<CastVote>> {
        let mut cast = Vec::new();

        for option_id in selection.chosen_multiple() {
            if self
                .vote_repo
                .find_by_user_and_option(&actor.id, option_id)
                .await?
                .is_some()
            {
                debug!(question_id = %question.id, option_id, "Already voted, skipped");
                continue;
            }

            match self
                .vote_repo
                .create(self.new_vote(actor, question, option_id))
                .await
            {
                Ok(_) => cast.push(cast_vote(question, option_id)),
                // Lost a race against an identical submission.
                Err(AppError::Uniqueness(_)) => {
                    debug!(question_id = %question.id, option_id, "Concurrent duplicate skipped");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(cast)
    }

    fn new_vote(&self, actor: &Actor, question: &question::Model, option_id: &str) -> vote::ActiveModel {
        vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(actor.id.clone()),
            option_id: Set(option_id.to_string()),
            question_id: Set(question.id.clone()),
            single_choice: Set(question.question_type == QuestionType::SingleChoice),
            created_at: Set(Utc::now().into()),
        }
    }
}

fn cast_vote(question: &question::Model, option_id: &str) -> CastVote {
    CastVote {
        question_id: question.id.clone(),
        option_id: option_id.to_string(),
        question_type: question.question_type,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::activity::testing::RecordingActivityRecorder;
    use chrono::NaiveDate;
    use pollhub_db::{
        entities::{poll, poll_option, user::UserRole},
        repositories::InvitationRepository,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
    use std::sync::Arc;

    fn create_test_poll(status: PollStatus) -> poll::Model {
        poll::Model {
            id: "p1".to_string(),
            title: "Lunch".to_string(),
            description: "Where should we eat".to_string(),
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2030, 1, 9).unwrap(),
            status,
            organizer_id: "org1".to_string(),
            is_private: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_question(kind: QuestionType) -> question::Model {
        question::Model {
            id: "q1".to_string(),
            poll_id: "p1".to_string(),
            text: "Which place?".to_string(),
            question_type: kind,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_option(id: &str) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            question_id: "q1".to_string(),
            text: id.to_uppercase(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: DatabaseConnection, recorder: ActivityRecorderService) -> VoteService {
        let db = Arc::new(db);
        VoteService::new(
            PollRepository::new(db.clone()),
            QuestionRepository::new(db.clone()),
            OptionRepository::new(db.clone()),
            VoteRepository::new(db.clone()),
            AccessEvaluator::new(InvitationRepository::new(db)),
            recorder,
        )
    }

    fn voter() -> Actor {
        Actor::new("v1", UserRole::Voter)
    }

    #[test]
    fn test_selection_helpers() {
        assert_eq!(Selection::single("a").chosen_single(), Some("a"));
        assert_eq!(Selection::single("0").chosen_single(), None);
        assert_eq!(Selection::Single(None).chosen_single(), None);

        let multi = Selection::multiple([("c", true), ("d", false)]);
        assert_eq!(multi.chosen_multiple().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(multi.chosen_single(), None);
    }

    #[test]
    fn test_selection_deserializes_untagged() {
        let selections: Selections =
            serde_json::from_str(r#"{"q1": "a", "q2": {"c": true, "d": false}, "q3": null}"#)
                .unwrap();

        assert_eq!(selections["q1"], Selection::single("a"));
        assert_eq!(selections["q2"], Selection::multiple([("c", true), ("d", false)]));
        assert_eq!(selections["q3"], Selection::Single(None));
    }

    #[tokio::test]
    async fn test_empty_selections_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let err = svc.cast_votes(&voter(), "p1", &Selections::new()).await.unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("no selection"));
    }

    #[tokio::test]
    async fn test_inactive_poll_is_state_error() {
        for status in [PollStatus::Draft, PollStatus::Closed] {
            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_poll(status)]])
                .into_connection();
            let recorder = Arc::new(RecordingActivityRecorder::default());
            let svc = service(db, recorder.clone());

            let selections = Selections::from([("q1".to_string(), Selection::single("a"))]);
            let result = svc.cast_votes(&voter(), "p1", &selections).await;

            assert!(matches!(result, Err(AppError::State(_))));
            assert!(recorder.types().is_empty());
        }
    }

    #[tokio::test]
    async fn test_foreign_option_aborts_without_writes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_poll(PollStatus::Active)]])
            .append_query_results([[create_test_question(QuestionType::SingleChoice)]])
            .append_query_results([[create_test_option("a"), create_test_option("b")]])
            .into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let selections = Selections::from([("q1".to_string(), Selection::single("zzz"))]);
        let result = svc.cast_votes(&voter(), "p1", &selections).await;

        assert!(matches!(result, Err(AppError::Reference(_))));
        assert!(recorder.types().is_empty());
    }

    #[tokio::test]
    async fn test_single_choice_first_vote() {
        let question = create_test_question(QuestionType::SingleChoice);
        let inserted = vote::Model {
            id: "v1".to_string(),
            user_id: "v1".to_string(),
            option_id: "a".to_string(),
            question_id: "q1".to_string(),
            single_choice: true,
            created_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_poll(PollStatus::Active)]])
            .append_query_results([[question]])
            .append_query_results([[create_test_option("a"), create_test_option("b")]])
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([sea_orm::MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([[inserted]])
            .into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let selections = Selections::from([("q1".to_string(), Selection::single("a"))]);
        let receipt = svc.cast_votes(&voter(), "p1", &selections).await.unwrap();

        assert_eq!(receipt.cast, 1);
        assert_eq!(receipt.votes[0].option_id, "a");
        assert_eq!(receipt.votes[0].question_type, QuestionType::SingleChoice);
        assert_eq!(recorder.types(), vec![ActivityType::VoteCast]);
    }

    #[tokio::test]
    async fn test_failed_question_does_not_skip_later_ones() {
        let mut second = create_test_question(QuestionType::SingleChoice);
        second.id = "q2".to_string();
        let mut other = create_test_option("b");
        other.question_id = "q2".to_string();
        let inserted = vote::Model {
            id: "v1".to_string(),
            user_id: "v1".to_string(),
            option_id: "b".to_string(),
            question_id: "q2".to_string(),
            single_choice: true,
            created_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_poll(PollStatus::Active)]])
            .append_query_results([[create_test_question(QuestionType::SingleChoice), second]])
            .append_query_results([[create_test_option("a"), other]])
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .append_query_results([Vec::<vote::Model>::new()])
            .append_exec_results([sea_orm::MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([[inserted]])
            .into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let selections = Selections::from([
            ("q1".to_string(), Selection::single("a")),
            ("q2".to_string(), Selection::single("b")),
        ]);
        let result = svc.cast_votes(&voter(), "p1", &selections).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(recorder.types(), vec![ActivityType::VoteCast]);
    }

    #[tokio::test]
    async fn test_no_option_selection_is_silent_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_poll(PollStatus::Active)]])
            .append_query_results([[create_test_question(QuestionType::SingleChoice)]])
            .append_query_results([[create_test_option("a")]])
            .into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let selections = Selections::from([("q1".to_string(), Selection::single("0"))]);
        let receipt = svc.cast_votes(&voter(), "p1", &selections).await.unwrap();

        assert_eq!(receipt.cast, 0);
        assert!(recorder.types().is_empty());
    }
}
