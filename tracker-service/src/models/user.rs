//! User accounts: password signups and Google OAuth logins share one row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const PROVIDER_LOCAL: &str = "local";
pub const PROVIDER_GOOGLE: &str = "google";

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub display_name: Option<String>,
    pub google_id: Option<String>,
    pub picture_url: Option<String>,
    pub provider_code: String,
    pub gmail_access_token: Option<String>,
    pub gmail_refresh_token: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a password-signup user.
    pub fn new(email: String, password_hash: String, display_name: Option<String>) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            password_hash: Some(password_hash),
            display_name,
            google_id: None,
            picture_url: None,
            provider_code: PROVIDER_LOCAL.to_string(),
            gmail_access_token: None,
            gmail_refresh_token: None,
            created_utc: Utc::now(),
        }
    }

    /// Create an OAuth-only user (no password).
    pub fn new_google(
        email: String,
        display_name: Option<String>,
        google_id: String,
        picture_url: Option<String>,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            password_hash: None,
            display_name,
            google_id: Some(google_id),
            picture_url,
            provider_code: PROVIDER_GOOGLE.to_string(),
            gmail_access_token: None,
            gmail_refresh_token: None,
            created_utc: Utc::now(),
        }
    }

    /// Response shape without the password hash or Gmail tokens.
    pub fn sanitized(&self) -> UserResponse {
        UserResponse {
            user_id: self.user_id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            picture_url: self.picture_url.clone(),
            provider_code: self.provider_code.clone(),
            gmail_linked: self
                .gmail_access_token
                .as_deref()
                .is_some_and(|t| !t.is_empty()),
            created_utc: self.created_utc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub picture_url: Option<String>,
    pub provider_code: String,
    pub gmail_linked: bool,
    pub created_utc: DateTime<Utc>,
}
