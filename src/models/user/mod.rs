pub mod user_dao;

use sqlx::types::{
    chrono::{DateTime, Utc},
    Uuid,
};

#[derive(FromRow, Serialize, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// bcrypt hash; empty string for OAuth-only accounts.
    #[serde(skip_serializing)]
    pub password: String,
    pub gh_id: Option<String>,
    #[serde(skip_serializing)]
    pub gh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The user's GitHub token, if one is stored and non-empty.
    pub fn github_token(&self) -> Option<&str> {
        self.gh_token.as_deref().filter(|t| !t.is_empty())
    }
}
