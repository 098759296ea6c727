//! Access control for polls.
//!
//! [`can_access`] is the single place where roles, ownership and invitation
//! state are combined into a permission decision. Services never compare
//! roles themselves; they call [`AccessEvaluator::ensure`] before acting.

use pollhub_common::{AppError, AppResult};
use pollhub_db::{
    entities::{poll, poll_invitation::InvitationStatus, user, user::UserRole},
    repositories::InvitationRepository,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The authenticated user an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: UserRole,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether this actor owns the poll.
    #[must_use]
    pub fn organizes(&self, poll: &poll::Model) -> bool {
        self.id == poll.organizer_id
    }
}

impl From<&user::Model> for Actor {
    fn from(user: &user::Model) -> Self {
        Self::new(user.id.clone(), user.role)
    }
}

/// What the actor wants to do with a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Read the poll, its questions, results and comments; vote.
    View,
    /// Change the poll or anything it owns.
    Modify,
}

/// Decide whether `actor` may act on `poll` with `intent`.
///
/// `invitation` is the status of the actor's invitation to the poll, if
/// any. It only matters for voters viewing a private poll.
#[must_use]
pub fn can_access(
    actor: &Actor,
    poll: &poll::Model,
    intent: Intent,
    invitation: Option<InvitationStatus>,
) -> bool {
    match intent {
        Intent::Modify => match actor.role {
            UserRole::Admin => true,
            UserRole::Organizer => actor.organizes(poll),
            UserRole::Voter => false,
        },
        Intent::View if !poll.is_private => true,
        // Any organizer may view private polls, not only the owner.
        Intent::View => match actor.role {
            UserRole::Admin | UserRole::Organizer => true,
            UserRole::Voter => {
                actor.organizes(poll) || invitation == Some(InvitationStatus::Accepted)
            }
        },
    }
}

/// Whether the actor's invitation status has to be looked up to decide.
const fn needs_invitation(actor: &Actor, poll: &poll::Model, intent: Intent) -> bool {
    matches!(intent, Intent::View) && poll.is_private && matches!(actor.role, UserRole::Voter)
}

/// Evaluates [`can_access`] against stored invitation state.
///
/// Nothing is cached: every call reads the current invitation.
#[derive(Clone)]
pub struct AccessEvaluator {
    invitation_repo: InvitationRepository,
}

impl AccessEvaluator {
    /// Create a new access evaluator.
    #[must_use]
    pub const fn new(invitation_repo: InvitationRepository) -> Self {
        Self { invitation_repo }
    }

    /// Whether `actor` may act on `poll` with `intent`.
    pub async fn allows(&self, actor: &Actor, poll: &poll::Model, intent: Intent) -> AppResult<bool> {
        let invitation = if needs_invitation(actor, poll, intent) {
            self.invitation_repo
                .find_by_poll_and_voter(&poll.id, &actor.id)
                .await?
                .map(|i| i.status)
        } else {
            None
        };

        Ok(can_access(actor, poll, intent, invitation))
    }

    /// Fail with a generic `Forbidden` unless access is allowed.
    pub async fn ensure(&self, actor: &Actor, poll: &poll::Model, intent: Intent) -> AppResult<()> {
        if self.allows(actor, poll, intent).await? {
            return Ok(());
        }

        warn!(actor_id = %actor.id, poll_id = %poll.id, ?intent, "Access denied");
        Err(AppError::Forbidden("forbidden".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use pollhub_db::entities::{poll::PollStatus, poll_invitation};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_poll(organizer_id: &str, is_private: bool) -> poll::Model {
        poll::Model {
            id: "p1".to_string(),
            title: "Team offsite".to_string(),
            description: "Pick a venue for the offsite".to_string(),
            start_date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2030, 5, 20).unwrap(),
            status: PollStatus::Active,
            organizer_id: organizer_id.to_string(),
            is_private,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_modify_admin_or_owning_organizer() {
        let poll = create_test_poll("org1", false);

        assert!(can_access(&Actor::new("adm", UserRole::Admin), &poll, Intent::Modify, None));
        assert!(can_access(&Actor::new("org1", UserRole::Organizer), &poll, Intent::Modify, None));
        assert!(!can_access(&Actor::new("org2", UserRole::Organizer), &poll, Intent::Modify, None));
        assert!(!can_access(&Actor::new("v1", UserRole::Voter), &poll, Intent::Modify, None));
    }

    #[test]
    fn test_view_public_poll_always_allowed() {
        let poll = create_test_poll("org1", false);
        let voter = Actor::new("v1", UserRole::Voter);

        assert!(can_access(&voter, &poll, Intent::View, None));
        assert!(can_access(&voter, &poll, Intent::View, Some(InvitationStatus::Declined)));
    }

    #[test]
    fn test_view_private_poll() {
        let poll = create_test_poll("org1", true);
        let voter = Actor::new("v1", UserRole::Voter);

        assert!(can_access(&Actor::new("org2", UserRole::Organizer), &poll, Intent::View, None));
        assert!(can_access(&Actor::new("adm", UserRole::Admin), &poll, Intent::View, None));
        assert!(!can_access(&voter, &poll, Intent::View, None));
        assert!(!can_access(&voter, &poll, Intent::View, Some(InvitationStatus::Pending)));
        assert!(!can_access(&voter, &poll, Intent::View, Some(InvitationStatus::Declined)));
        assert!(can_access(&voter, &poll, Intent::View, Some(InvitationStatus::Accepted)));
    }

    #[test]
    fn test_accepted_invitation_never_grants_modify() {
        let poll = create_test_poll("org1", true);
        let voter = Actor::new("v1", UserRole::Voter);

        assert!(!can_access(&voter, &poll, Intent::Modify, Some(InvitationStatus::Accepted)));
    }

    #[tokio::test]
    async fn test_ensure_reads_invitation_for_private_view() {
        let poll = create_test_poll("org1", true);
        let invitation = poll_invitation::Model {
            id: "i1".to_string(),
            poll_id: "p1".to_string(),
            voter_id: "v1".to_string(),
            invited_by_id: Some("org1".to_string()),
            status: InvitationStatus::Accepted,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[invitation]])
                .into_connection(),
        );

        let evaluator = AccessEvaluator::new(InvitationRepository::new(db));
        let voter = Actor::new("v1", UserRole::Voter);

        assert!(evaluator.ensure(&voter, &poll, Intent::View).await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_denies_with_generic_forbidden() {
        let poll = create_test_poll("org1", true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<poll_invitation::Model>::new()])
                .into_connection(),
        );

        let evaluator = AccessEvaluator::new(InvitationRepository::new(db));
        let voter = Actor::new("v1", UserRole::Voter);
        let result = evaluator.ensure(&voter, &poll, Intent::View).await;

        match result {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "forbidden"),
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }
}
