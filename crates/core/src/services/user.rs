//! User service.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use pollhub_common::{AppError, AppResult, IdGenerator, ViolationKind, Violations};
use pollhub_db::{
    entities::{activity::ActivityType, user, user::UserRole},
    repositories::{PollRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::access::Actor;
use crate::services::activity::{notify, ActivityRecorderService};
use crate::validation::rules;

const DEFAULT_LIST_LIMIT: u64 = 100;

/// Input for creating a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    pub username: String,

    #[validate(email(message = "is not a valid email address"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,

    #[serde(default)]
    pub role: UserRole,
}

/// Input for updating a user.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    pub username: Option<String>,

    #[validate(email(message = "is not a valid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: Option<String>,

    pub role: Option<UserRole>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    poll_repo: PollRepository,
    recorder: ActivityRecorderService,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        poll_repo: PollRepository,
        recorder: ActivityRecorderService,
    ) -> Self {
        Self {
            user_repo,
            poll_repo,
            recorder,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a user.
    ///
    /// Anyone may sign up as a voter; other roles are handed out by admins.
    pub async fn create(
        &self,
        actor: Option<&Actor>,
        input: CreateUserInput,
    ) -> AppResult<user::Model> {
        if input.role != UserRole::Voter && !actor.is_some_and(Actor::is_admin) {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }

        let email = normalize_email(&input.email);

        let mut violations = validation_violations(&input);
        rules::check_username(&mut violations, &input.username);
        self.check_identity_unique(&mut violations, Some(&input.username), Some(&email), None)
            .await?;
        violations.into_result()?;

        let password_digest = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            email: Set(email),
            password_digest: Set(password_digest),
            role: Set(input.role),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, role = user.role.as_str(), "User created");

        notify(
            &self.recorder,
            Some(actor.map_or(user.id.as_str(), |a| a.id.as_str())),
            ActivityType::UserCreated,
            &format!("User {} created", user.username),
        )
        .await;

        Ok(user)
    }

    /// Update a user. Users edit themselves; only admins change roles.
    pub async fn update(
        &self,
        actor: &Actor,
        user_id: &str,
        input: UpdateUserInput,
    ) -> AppResult<user::Model> {
        if actor.id != user_id && !actor.is_admin() {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }
        if input.role.is_some() && !actor.is_admin() {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }

        let user = self.user_repo.get_by_id(user_id).await?;
        let email = input.email.as_deref().map(normalize_email);

        let mut violations = validation_violations(&input);
        if let Some(username) = &input.username {
            rules::check_username(&mut violations, username);
        }
        self.check_identity_unique(
            &mut violations,
            input.username.as_deref(),
            email.as_deref(),
            Some(&user.id),
        )
        .await?;
        violations.into_result()?;

        let mut active: user::ActiveModel = user.into();
        if let Some(username) = input.username {
            active.username = Set(username);
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(password) = input.password {
            active.password_digest = Set(hash_password(&password)?);
        }
        if let Some(role) = input.role {
            active.role = Set(role);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let user = self.user_repo.update(active).await?;
        info!(user_id = %user.id, "User updated");

        notify(
            &self.recorder,
            Some(&actor.id),
            ActivityType::UserUpdated,
            &format!("User {} updated", user.username),
        )
        .await;

        Ok(user)
    }

    /// Delete a user together with their votes, invitations and comments.
    pub async fn delete(&self, actor: &Actor, user_id: &str) -> AppResult<()> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }
        if actor.id == user_id {
            return Err(AppError::State("cannot delete your own account".to_string()));
        }

        let user = self.user_repo.get_by_id(user_id).await?;

        let organized = self.poll_repo.count_by_organizer(&user.id).await?;
        if organized > 0 {
            return Err(AppError::State(format!(
                "user still organizes {organized} poll(s)"
            )));
        }

        self.user_repo.delete_cascade(&user.id).await?;
        info!(user_id = %user.id, "User deleted");
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get(&self, user_id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(user_id).await
    }

    /// List users. Admin only.
    pub async fn list(
        &self,
        actor: &Actor,
        limit: Option<u64>,
        offset: u64,
    ) -> AppResult<Vec<user::Model>> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden("forbidden".to_string()));
        }
        self.user_repo
            .list(limit.unwrap_or(DEFAULT_LIST_LIMIT), offset)
            .await
    }

    /// Authenticate a user by username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Actor> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &user.password_digest)? {
            return Err(invalid_credentials());
        }

        Ok(Actor::from(&user))
    }

    async fn check_identity_unique(
        &self,
        violations: &mut Violations,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<&str>,
    ) -> AppResult<()> {
        let other = |u: &user::Model| Some(u.id.as_str()) != except;

        if let Some(username) = username
            && self
                .user_repo
                .find_by_username(username)
                .await?
                .is_some_and(|u| other(&u))
        {
            violations.push("username", ViolationKind::Uniqueness, "has already been taken");
        }

        if let Some(email) = email
            && self
                .user_repo
                .find_by_email(email)
                .await?
                .is_some_and(|u| other(&u))
        {
            violations.push("email", ViolationKind::Uniqueness, "has already been taken");
        }

        Ok(())
    }
}

fn validation_violations(input: &impl Validate) -> Violations {
    input.validate().map_or_else(Violations::from, |()| Violations::new())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::Forbidden("invalid credentials".to_string())
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, digest: &str) -> AppResult<bool> {
    let parsed =
        PasswordHash::new(digest).map_err(|e| AppError::Internal(format!("Invalid digest: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::activity::testing::RecordingActivityRecorder;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str, role: UserRole) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_digest: hash_password("correct horse").unwrap(),
            role,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: DatabaseConnection, recorder: ActivityRecorderService) -> UserService {
        let db = Arc::new(db);
        UserService::new(
            UserRepository::new(db.clone()),
            PollRepository::new(db),
            recorder,
        )
    }

    fn signup(username: &str, role: UserRole) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "correct horse".to_string(),
            role,
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let digest = hash_password("correct horse").unwrap();

        assert!(digest.starts_with("$argon2"));
        assert!(verify_password("correct horse", &digest).unwrap());
        assert!(!verify_password("battery staple", &digest).unwrap());
    }

    #[test]
    fn test_verify_password_rejects_garbage_digest() {
        assert!(matches!(
            verify_password("pw", "not-a-digest"),
            Err(AppError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_signup_as_organizer_requires_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let result = svc.create(None, signup("alice", UserRole::Organizer)).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let voter = Actor::new("v1", UserRole::Voter);
        let result = svc
            .create(Some(&voter), signup("alice", UserRole::Admin))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_signup_collects_every_violation() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let input = CreateUserInput {
            username: "a b".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
            role: UserRole::Voter,
        };
        let err = svc.create(None, input).await.unwrap_err();

        let violations = err.violations().unwrap();
        assert!(violations.has_field("username"));
        assert!(violations.has_field("email"));
        assert!(violations.has_field("password"));
    }

    #[tokio::test]
    async fn test_signup_taken_username_is_uniqueness_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u1", "alice", UserRole::Voter)]])
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let result = svc.create(None, signup("alice", UserRole::Voter)).await;
        assert!(matches!(result, Err(AppError::Uniqueness(_))));
    }

    #[tokio::test]
    async fn test_signup_records_activity() {
        let created = create_test_user("u1", "alice", UserRole::Voter);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[created]])
            .into_connection();
        let recorder = Arc::new(RecordingActivityRecorder::default());
        let svc = service(db, recorder.clone());

        let user = svc.create(None, signup("alice", UserRole::Voter)).await.unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(recorder.types(), vec![ActivityType::UserCreated]);
    }

    #[tokio::test]
    async fn test_update_role_requires_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let me = Actor::new("u1", UserRole::Voter);
        let input = UpdateUserInput {
            role: Some(UserRole::Organizer),
            ..Default::default()
        };

        assert!(matches!(
            svc.update(&me, "u1", input).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            svc.update(&me, "u2", UpdateUserInput::default()).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));
        let admin = Actor::new("adm", UserRole::Admin);

        assert!(matches!(
            svc.delete(&Actor::new("org1", UserRole::Organizer), "u1").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            svc.delete(&admin, "adm").await,
            Err(AppError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_organizer_with_polls_is_state_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("org1", "olga", UserRole::Organizer)]])
            .append_query_results([[btreemap! {
                "num_items" => Value::BigInt(Some(2)),
            }]])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let result = svc.delete(&Actor::new("adm", UserRole::Admin), "org1").await;
        assert!(matches!(result, Err(AppError::State(_))));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let user = create_test_user("u1", "alice", UserRole::Organizer);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()]])
            .append_query_results([[user]])
            .into_connection();
        let svc = service(db, Arc::new(RecordingActivityRecorder::default()));

        let actor = svc.authenticate("alice", "correct horse").await.unwrap();
        assert_eq!(actor, Actor::new("u1", UserRole::Organizer));

        let result = svc.authenticate("alice", "wrong").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
