//! Validation layer.
//!
//! Every mutating operation collects [`Violations`] here before it writes
//! anything. Pure attribute rules live in [`rules`] and [`dates`];
//! [`Validator`] adds the checks that need to read stored rows.

pub mod dates;
pub mod rules;

use std::collections::HashMap;

use chrono::NaiveDate;
use pollhub_common::{AppResult, ViolationKind, Violations};
use pollhub_db::{
    entities::{
        poll::{self, PollStatus},
        poll_invitation::InvitationStatus,
        poll_option, question,
        question::QuestionType,
        user,
    },
    repositories::{InvitationRepository, OptionRepository, UserRepository},
};

use crate::access::Actor;
use crate::services::vote::{Selection, Selections};

/// Check the free-text and date attributes of a poll.
pub fn check_poll_attributes(
    violations: &mut Violations,
    title: &str,
    description: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
    active: bool,
) {
    rules::check_poll_title(violations, title);
    rules::check_poll_description(violations, description);
    dates::check_poll_dates(violations, start_date, end_date, today, active);
}

/// Check that a poll's questions and options may still be changed.
///
/// Closed polls are frozen. With `strict` set, only drafts are editable.
pub fn check_poll_editable(violations: &mut Violations, poll: &poll::Model, strict: bool) {
    match poll.status {
        PollStatus::Closed => {
            violations.push("poll", ViolationKind::State, "is closed and cannot be changed");
        }
        PollStatus::Active if strict => violations.push(
            "poll",
            ViolationKind::State,
            "is active; questions and options can only be changed while draft",
        ),
        _ => {}
    }
}

/// Check that every selection targets a question of the poll, uses the
/// shape of that question's type and names options of that question.
pub fn check_selections(
    violations: &mut Violations,
    selections: &Selections,
    questions: &[question::Model],
    options: &[poll_option::Model],
) {
    let by_id: HashMap<&str, &question::Model> =
        questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let option_question: HashMap<&str, &str> = options
        .iter()
        .map(|o| (o.id.as_str(), o.question_id.as_str()))
        .collect();

    for (question_id, selection) in selections {
        let field = format!("selections.{question_id}");

        let Some(question) = by_id.get(question_id.as_str()) else {
            violations.push(
                &field,
                ViolationKind::Reference,
                "question does not belong to this poll",
            );
            continue;
        };

        let option_ids: Vec<&str> = match (question.question_type, selection) {
            (QuestionType::SingleChoice, Selection::Single(_)) => {
                selection.chosen_single().into_iter().collect()
            }
            (QuestionType::MultipleChoice, Selection::Multiple(flags)) => {
                flags.keys().map(String::as_str).collect()
            }
            _ => {
                violations.push(
                    &field,
                    ViolationKind::Invalid,
                    format!("does not match question type {}", question.question_type.as_str()),
                );
                continue;
            }
        };

        for option_id in option_ids {
            if option_question.get(option_id) != Some(&question.id.as_str()) {
                violations.push(
                    &field,
                    ViolationKind::Reference,
                    format!("option {option_id} does not belong to this question"),
                );
            }
        }
    }
}

/// Checks that read stored state.
#[derive(Clone)]
pub struct Validator {
    user_repo: UserRepository,
    option_repo: OptionRepository,
    invitation_repo: InvitationRepository,
}

impl Validator {
    /// Create a new validator.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        option_repo: OptionRepository,
        invitation_repo: InvitationRepository,
    ) -> Self {
        Self {
            user_repo,
            option_repo,
            invitation_repo,
        }
    }

    /// Resolve a user reference, recording a `Reference` violation when it
    /// dangles.
    pub async fn require_user(
        &self,
        violations: &mut Violations,
        field: &str,
        user_id: &str,
    ) -> AppResult<Option<user::Model>> {
        let user = self.user_repo.find_by_id(user_id).await?;
        if user.is_none() {
            violations.push(field, ViolationKind::Reference, "must reference an existing user");
        }
        Ok(user)
    }

    /// Option texts are unique (trimmed) within a question. `except` skips
    /// the option being renamed.
    pub async fn check_option_text_unique(
        &self,
        violations: &mut Violations,
        question_id: &str,
        text: &str,
        except: Option<&str>,
    ) -> AppResult<()> {
        let taken = self
            .option_repo
            .find_by_question(question_id)
            .await?
            .iter()
            .filter(|o| Some(o.id.as_str()) != except)
            .any(|o| rules::same_option_text(&o.text, text));

        if taken {
            violations.push("text", ViolationKind::Uniqueness, "has already been taken");
        }
        Ok(())
    }

    /// Private polls only take comments from their organizer and from
    /// voters who accepted an invitation.
    pub async fn check_can_comment(
        &self,
        violations: &mut Violations,
        actor: &Actor,
        poll: &poll::Model,
    ) -> AppResult<()> {
        if !poll.is_private || actor.organizes(poll) {
            return Ok(());
        }

        let accepted = self
            .invitation_repo
            .find_by_poll_and_voter(&poll.id, &actor.id)
            .await?
            .is_some_and(|i| i.status == InvitationStatus::Accepted);

        if !accepted {
            violations.push(
                "poll",
                ViolationKind::Authorization,
                "is private; only its organizer and invited voters may comment",
            );
        }
        Ok(())
    }

    /// A voter is invited to a poll at most once.
    pub async fn check_invitation_unique(
        &self,
        violations: &mut Violations,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<()> {
        if self
            .invitation_repo
            .find_by_poll_and_voter(poll_id, voter_id)
            .await?
            .is_some()
        {
            violations.push("voter_id", ViolationKind::Uniqueness, "has already been invited");
        }
        Ok(())
    }
}
