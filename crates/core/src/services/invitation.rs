//! Invitation manager.
//!
//! An invitation moves `pending -> accepted` or `pending -> declined` once.
//! Accepting is what lets a voter see and vote on a private poll.

use chrono::Utc;
use pollhub_common::{AppError, AppResult, IdGenerator, ViolationKind, Violations};
use pollhub_db::{
    entities::{
        poll_invitation::{self, InvitationStatus},
        user::UserRole,
    },
    repositories::{InvitationRepository, PollRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;

use crate::access::{AccessEvaluator, Actor, Intent};
use crate::validation::Validator;

/// Input for inviting a voter to a private poll.
#[derive(Debug, Clone, Deserialize)]
pub struct InviteInput {
    pub poll_id: String,
    pub voter_id: String,
}

/// Invitation service for business logic.
#[derive(Clone)]
pub struct InvitationService {
    invitation_repo: InvitationRepository,
    poll_repo: PollRepository,
    access: AccessEvaluator,
    validator: Validator,
    id_gen: IdGenerator,
}

impl InvitationService {
    /// Create a new invitation service.
    #[must_use]
    pub const fn new(
        invitation_repo: InvitationRepository,
        poll_repo: PollRepository,
        access: AccessEvaluator,
        validator: Validator,
    ) -> Self {
        Self {
            invitation_repo,
            poll_repo,
            access,
            validator,
            id_gen: IdGenerator::new(),
        }
    }

    /// Invite a voter to a private poll.
    pub async fn invite(
        &self,
        actor: &Actor,
        input: InviteInput,
    ) -> AppResult<poll_invitation::Model> {
        let poll = self.poll_repo.get_by_id(&input.poll_id).await?;

        if !actor.role.can_organize() && !actor.organizes(&poll) {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }
        if !poll.is_private {
            return Err(AppError::State(
                "invitations are only for private polls".to_string(),
            ));
        }

        let mut violations = Violations::new();
        if let Some(voter) = self
            .validator
            .require_user(&mut violations, "voter_id", &input.voter_id)
            .await?
            && voter.role != UserRole::Voter
        {
            violations.push("voter_id", ViolationKind::Invalid, "must be a voter");
        }
        self.validator
            .check_invitation_unique(&mut violations, &poll.id, &input.voter_id)
            .await?;
        violations.into_result()?;

        let now = Utc::now();
        let model = poll_invitation::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll.id.clone()),
            voter_id: Set(input.voter_id),
            invited_by_id: Set(Some(actor.id.clone())),
            status: Set(InvitationStatus::Pending),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let invitation = self.invitation_repo.create(model).await?;
        info!(
            invitation_id = %invitation.id,
            poll_id = %poll.id,
            voter_id = %invitation.voter_id,
            "Voter invited"
        );
        Ok(invitation)
    }

    /// Accept a pending invitation.
    pub async fn accept(
        &self,
        actor: &Actor,
        invitation_id: &str,
    ) -> AppResult<poll_invitation::Model> {
        self.decide(actor, invitation_id, InvitationStatus::Accepted)
            .await
    }

    /// Decline a pending invitation.
    pub async fn decline(
        &self,
        actor: &Actor,
        invitation_id: &str,
    ) -> AppResult<poll_invitation::Model> {
        self.decide(actor, invitation_id, InvitationStatus::Declined)
            .await
    }

    async fn decide(
        &self,
        actor: &Actor,
        invitation_id: &str,
        status: InvitationStatus,
    ) -> AppResult<poll_invitation::Model> {
        let invitation = self.invitation_repo.get_by_id(invitation_id).await?;

        if invitation.voter_id != actor.id {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(already_decided(invitation.status));
        }

        // The status filter in the update settles concurrent decisions.
        if !self.invitation_repo.decide(invitation_id, status).await? {
            return Err(already_decided(invitation.status));
        }

        info!(
            invitation_id,
            poll_id = %invitation.poll_id,
            status = status.as_str(),
            "Invitation decided"
        );
        self.invitation_repo.get_by_id(invitation_id).await
    }

    /// Remove an invitation, whatever its status.
    pub async fn revoke(&self, actor: &Actor, invitation_id: &str) -> AppResult<()> {
        let invitation = self.invitation_repo.get_by_id(invitation_id).await?;
        let poll = self.poll_repo.get_by_id(&invitation.poll_id).await?;
        self.access.ensure(actor, &poll, Intent::Modify).await?;

        self.invitation_repo.delete(invitation_id).await?;
        info!(invitation_id, poll_id = %poll.id, "Invitation revoked");
        Ok(())
    }

    /// Invitations the actor has not answered yet.
    pub async fn pending_for(&self, actor: &Actor) -> AppResult<Vec<poll_invitation::Model>> {
        self.invitation_repo.find_pending_for_voter(&actor.id).await
    }

    /// Every invitation of a poll.
    pub async fn for_poll(
        &self,
        actor: &Actor,
        poll_id: &str,
    ) -> AppResult<Vec<poll_invitation::Model>> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.access.ensure(actor, &poll, Intent::Modify).await?;
        self.invitation_repo.find_by_poll(&poll.id).await
    }
}

fn already_decided(current: InvitationStatus) -> AppError {
    AppError::State(format!("invitation has already been {}", current.as_str()))
}
