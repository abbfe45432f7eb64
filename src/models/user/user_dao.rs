use crate::models::user::User;
use crate::state::AppStateRaw;

use sqlx::{types::Uuid, Error};

#[derive(Debug)]
pub enum UserInsertError {
    AlreadyExists,
    Sqlx(sqlx::Error),
}

#[async_trait]
pub trait IUser: std::ops::Deref<Target = AppStateRaw> {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, password, gh_id, gh_token, created_at, updated_at
               FROM users
               WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.db_conn)
        .await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, password, gh_id, gh_token, created_at, updated_at
               FROM users
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db_conn)
        .await
    }

    async fn insert_credentials(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Uuid, UserInsertError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO users (email, password)
               VALUES ($1, $2)
               RETURNING id"#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db_conn)
        .await
        .inspect_err(|e| error!("error inserting user: {:?}", e))?;

        Ok(id)
    }

    /// Create-or-update keyed by email, as used by GitHub sign-in. New
    /// accounts get an empty password; existing ones keep theirs and pick up
    /// the fresh GitHub id and token.
    async fn upsert_github(
        &self,
        email: &str,
        gh_id: &str,
        gh_token: &str,
    ) -> Result<Uuid, UserInsertError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO users (email, password, gh_id, gh_token)
               VALUES ($1, '', $2, $3)
               ON CONFLICT (email) DO UPDATE
               SET gh_id = EXCLUDED.gh_id,
                   gh_token = EXCLUDED.gh_token,
                   updated_at = now()
               RETURNING id"#,
        )
        .bind(email)
        .bind(gh_id)
        .bind(gh_token)
        .fetch_one(&self.db_conn)
        .await
        .inspect_err(|e| error!("error upserting user from GitHub sign-in: {:?}", e))?;

        Ok(id)
    }

    /// Removes the user; their projects go with them via the FK cascade.
    async fn delete_user(&self, id: &Uuid) -> Result<u64, sqlx::Error> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db_conn)
            .await?;

        Ok(res.rows_affected())
    }
}

impl From<sqlx::Error> for UserInsertError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            Error::Database(ref err) => {
                if err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
                    Self::AlreadyExists
                } else {
                    Self::Sqlx(e)
                }
            }
            _ => Self::Sqlx(e),
        }
    }
}

impl IUser for &AppStateRaw {}
