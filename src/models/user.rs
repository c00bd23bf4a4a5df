//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum username length
pub const USERNAME_MAX_LEN: usize = 150;

/// A registered user.
///
/// Users own posts and comments. Staff users may additionally manage
/// categories and locations through the admin console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// First name (may be empty)
    pub first_name: String,
    /// Last name (may be empty)
    pub last_name: String,
    /// Email address (may be empty)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Access to the admin console
    pub is_staff: bool,
    /// Registration timestamp
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Create a new User with an already hashed password.
    pub fn new(username: String, password_hash: String, is_staff: bool) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash,
            is_staff,
            date_joined: Utc::now(),
        }
    }

    /// "First Last", falling back to the username when both names are empty
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Profile fields a user may change about themselves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

impl UpdateProfileInput {
    /// Prefill the form from the stored user
    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Check a username against the allowed alphabet: letters, digits and `@.+-_`
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= USERNAME_MAX_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}
