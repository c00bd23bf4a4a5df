//! User service
//!
//! Registration, login and logout, session lookup, profile editing and
//! password change. The first registered user becomes staff.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{is_valid_username, Session, UpdateProfileInput, User, USERNAME_MAX_LEN};
use crate::services::password::{check_new_password, hash_password, verify_password};
use crate::services::policy::{authorize, Action, Actor, Target};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Wrong username or password
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Form input rejected; one message per problem
    #[error("Validation error: {}", .0.join(" "))]
    ValidationError(Vec<String>),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    NotFound(String),

    /// Someone else's profile
    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl UserServiceError {
    /// Messages to show next to the form
    pub fn messages(&self) -> Vec<String> {
        match self {
            UserServiceError::ValidationError(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Login form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Password change form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangePasswordInput {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password1: String,
    #[serde(default)]
    pub new_password2: String,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service with a custom session lifetime
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a malformed username or an unacceptable password pair
    /// - `UserExists` if the username is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();

        let mut problems = username_problems(&username);
        problems.extend(check_new_password(&input.password1, &input.password2));
        if !problems.is_empty() {
            return Err(UserServiceError::ValidationError(problems));
        }

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(username));
        }

        let is_first = self.is_first_user().await?;
        let password_hash = hash_password(&input.password1).context("Failed to hash password")?;

        let created = self
            .user_repo
            .create(&User::new(username, password_hash, is_first))
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, is_staff = created.is_staff, "User registered");
        Ok(created)
    }

    /// Check credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_username(input.username.trim())
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?
        {
            tracing::debug!(username = %user.username, "Login failed");
            return Err(invalid());
        }

        let session = self
            .session_repo
            .create(&Session::new(user.id, self.session_expiration_days))
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// Delete the session behind `token`
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired tokens give `None`; an expired session is deleted
    /// on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(|| UserServiceError::NotFound(username.to_string()))
    }

    /// Profile of `username` for its edit form, if `actor` owns it
    pub async fn get_for_edit(&self, username: &str, actor: &Actor) -> Result<User, UserServiceError> {
        let user = self.get_by_username(username).await?;
        authorize(actor, Target::Profile { user_id: user.id }, Action::Edit)
            .map_err(|_| UserServiceError::Forbidden)?;
        Ok(user)
    }

    /// Update the profile of `username` on behalf of `actor`
    pub async fn update_profile(
        &self,
        username: &str,
        actor: &Actor,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        let user = self.get_for_edit(username, actor).await?;

        let input = UpdateProfileInput {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
        };

        let mut problems = username_problems(&input.username);
        if !input.email.is_empty() && !looks_like_email(&input.email) {
            problems.push("Enter a valid email address.".to_string());
        }
        if !problems.is_empty() {
            return Err(UserServiceError::ValidationError(problems));
        }

        if input.username != user.username {
            if let Some(existing) = self
                .user_repo
                .get_by_username(&input.username)
                .await
                .context("Failed to check username")?
            {
                if existing.id != user.id {
                    return Err(UserServiceError::UserExists(input.username));
                }
            }
        }

        let updated = self
            .user_repo
            .update_profile(user.id, &input)
            .await
            .context("Failed to update profile")?;

        tracing::info!(user_id = updated.id, "Profile updated");
        Ok(updated)
    }

    /// Replace the password of `user` after checking the old one
    pub async fn change_password(
        &self,
        user: &User,
        input: ChangePasswordInput,
    ) -> Result<(), UserServiceError> {
        let stored = self
            .user_repo
            .get_by_id(user.id)
            .await
            .context("Failed to reload user")?
            .ok_or_else(|| UserServiceError::NotFound(user.username.clone()))?;

        let mut problems = Vec::new();
        if !verify_password(&input.old_password, &stored.password_hash)
            .context("Failed to verify password")?
        {
            problems.push(
                "Your old password was entered incorrectly. Please enter it again.".to_string(),
            );
        }
        problems.extend(check_new_password(&input.new_password1, &input.new_password2));
        if !problems.is_empty() {
            return Err(UserServiceError::ValidationError(problems));
        }

        let password_hash =
            hash_password(&input.new_password1).context("Failed to hash password")?;
        self.user_repo
            .update_password(stored.id, &password_hash)
            .await
            .context("Failed to update password")?;

        tracing::info!(user_id = stored.id, "Password changed");
        Ok(())
    }

    /// True while no user exists
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many went
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}

fn username_problems(username: &str) -> Vec<String> {
    if username.is_empty() {
        vec!["Username is required.".to_string()]
    } else if !is_valid_username(username) {
        vec![format!(
            "Enter a valid username. It may contain at most {} letters, digits and @/./+/-/_ characters.",
            USERNAME_MAX_LEN
        )]
    } else {
        Vec::new()
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
