use crate::github::GithubError;

use sqlx::types::{
    chrono::{DateTime, Utc},
    Uuid,
};
use sqlx::Error;

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub url: String,
    pub stars: i32,
    pub forks: i32,
    pub issues: i32,
    pub gh_id: i64,
    pub description: Option<String>,
    pub language: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum ProjectError {
    Unauthorized,
    /// The (user, owner, name) triple already exists.
    AlreadyAdded,
    NotFound,
    NotOwner,
    Github(GithubError),
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for ProjectError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            Error::RowNotFound => Self::NotFound,
            Error::Database(ref err) => {
                if err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
                    Self::AlreadyAdded
                } else {
                    Self::Sqlx(e)
                }
            }
            _ => Self::Sqlx(e),
        }
    }
}

impl From<GithubError> for ProjectError {
    fn from(e: GithubError) -> Self {
        Self::Github(e)
    }
}
