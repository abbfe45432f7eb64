use crate::github::{RepoData, RepoPath};
use crate::middlewares::auth::Auth;
use crate::models::project::{Project, ProjectError};
use crate::persisters::{Persist, Query};
use crate::state::State;

use sqlx::types::Uuid;

/// All of the session user's projects, newest first.
pub struct ProjectList;

#[async_trait]
impl Query for ProjectList {
    type Resolve = Vec<Project>;
    type Error = ProjectError;

    async fn fetch(self, auth: Option<&Auth>, state: &State) -> Result<Self::Resolve, Self::Error> {
        let claims = &auth.ok_or(ProjectError::Unauthorized)?.claims;

        let res = sqlx::query_as::<_, Project>(
            r#"SELECT id, owner, name, url, stars, forks, issues, gh_id, description,
                      language, user_id, created_at, updated_at
               FROM projects
               WHERE user_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(claims.sub)
        .fetch_all(&state.db_conn)
        .await?;

        Ok(res)
    }
}

/// A single project by id, regardless of owner. Handlers compare `user_id`
/// against the session user so they can answer 403 rather than a blanket 404.
pub struct ProjectById(pub Uuid);

#[async_trait]
impl Query for ProjectById {
    type Resolve = Project;
    type Error = ProjectError;

    async fn fetch(
        self,
        _auth: Option<&Auth>,
        state: &State,
    ) -> Result<Self::Resolve, Self::Error> {
        let res = sqlx::query_as::<_, Project>(
            r#"SELECT id, owner, name, url, stars, forks, issues, gh_id, description,
                      language, user_id, created_at, updated_at
               FROM projects
               WHERE id = $1"#,
        )
        .bind(self.0)
        .fetch_optional(&state.db_conn)
        .await?;

        res.ok_or(ProjectError::NotFound)
    }
}

/// Does the session user already track this repo?
pub struct ProjectByRepo<'a> {
    pub owner: &'a str,
    pub name: &'a str,
}

#[async_trait]
impl<'a> Query for ProjectByRepo<'a> {
    type Resolve = Option<Project>;
    type Error = ProjectError;

    async fn fetch(self, auth: Option<&Auth>, state: &State) -> Result<Self::Resolve, Self::Error> {
        let claims = &auth.ok_or(ProjectError::Unauthorized)?.claims;

        let res = sqlx::query_as::<_, Project>(
            r#"SELECT id, owner, name, url, stars, forks, issues, gh_id, description,
                      language, user_id, created_at, updated_at
               FROM projects
               WHERE user_id = $1 AND owner = $2 AND name = $3"#,
        )
        .bind(claims.sub)
        .bind(self.owner)
        .bind(self.name)
        .fetch_optional(&state.db_conn)
        .await?;

        Ok(res)
    }
}

#[derive(Debug)]
pub struct ProjectCreate {
    pub owner: String,
    pub name: String,
    pub url: String,
    pub stars: i32,
    pub forks: i32,
    pub issues: i32,
    pub gh_id: i64,
    pub description: Option<String>,
    pub language: Option<String>,
}

impl ProjectCreate {
    pub fn from_repo(path: &RepoPath, data: &RepoData) -> Self {
        ProjectCreate {
            owner: path.owner.clone(),
            name: path.name.clone(),
            url: data.html_url.clone(),
            stars: data.stargazers_count,
            forks: data.forks_count,
            issues: data.open_issues_count,
            gh_id: data.id,
            description: data.description.clone(),
            language: data.language.clone(),
        }
    }
}

#[async_trait]
impl Persist for ProjectCreate {
    type Ret = Project;
    type Error = ProjectError;

    async fn persist(self, auth: Option<&Auth>, state: &State) -> Result<Self::Ret, Self::Error> {
        let claims = &auth.ok_or(ProjectError::Unauthorized)?.claims;

        // The unique index on (user_id, owner, name) backstops the explicit
        // existence check done by the handler; a 23505 here maps to
        // AlreadyAdded.
        let res = sqlx::query_as::<_, Project>(
            r#"INSERT INTO projects
                   (owner, name, url, stars, forks, issues, gh_id, description, language, user_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id, owner, name, url, stars, forks, issues, gh_id, description,
                         language, user_id, created_at, updated_at"#,
        )
        .bind(&self.owner)
        .bind(&self.name)
        .bind(&self.url)
        .bind(self.stars)
        .bind(self.forks)
        .bind(self.issues)
        .bind(self.gh_id)
        .bind(&self.description)
        .bind(&self.language)
        .bind(claims.sub)
        .fetch_one(&state.db_conn)
        .await
        .inspect_err(|e| error!("error inserting project: {:?}", e))?;

        Ok(res)
    }
}

/// Refreshed stats for an existing project, as fetched from GitHub. Scoped to
/// the owning user; updating someone else's project resolves to NotFound.
#[derive(Debug)]
pub struct ProjectSync {
    pub id: Uuid,
    pub stars: i32,
    pub forks: i32,
    pub issues: i32,
    pub description: Option<String>,
    pub language: Option<String>,
}

impl ProjectSync {
    pub fn from_repo(id: Uuid, data: &RepoData) -> Self {
        ProjectSync {
            id,
            stars: data.stargazers_count,
            forks: data.forks_count,
            issues: data.open_issues_count,
            description: data.description.clone(),
            language: data.language.clone(),
        }
    }
}

#[async_trait]
impl Persist for ProjectSync {
    type Ret = Project;
    type Error = ProjectError;

    async fn persist(self, auth: Option<&Auth>, state: &State) -> Result<Self::Ret, Self::Error> {
        let claims = &auth.ok_or(ProjectError::Unauthorized)?.claims;

        let res = sqlx::query_as::<_, Project>(
            r#"UPDATE projects
               SET stars = $1, forks = $2, issues = $3, description = $4, language = $5,
                   updated_at = now()
               WHERE id = $6 AND user_id = $7
               RETURNING id, owner, name, url, stars, forks, issues, gh_id, description,
                         language, user_id, created_at, updated_at"#,
        )
        .bind(self.stars)
        .bind(self.forks)
        .bind(self.issues)
        .bind(&self.description)
        .bind(&self.language)
        .bind(self.id)
        .bind(claims.sub)
        .fetch_optional(&state.db_conn)
        .await
        .inspect_err(|e| error!("error syncing project: {:?}", e))?;

        res.ok_or(ProjectError::NotFound)
    }
}

/// Deletes a project, scoped to the owning user.
pub struct ProjectDelete(pub Uuid);

#[async_trait]
impl Persist for ProjectDelete {
    type Ret = ();
    type Error = ProjectError;

    async fn persist(self, auth: Option<&Auth>, state: &State) -> Result<Self::Ret, Self::Error> {
        let claims = &auth.ok_or(ProjectError::Unauthorized)?.claims;

        let res = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
            .bind(self.0)
            .bind(claims.sub)
            .execute(&state.db_conn)
            .await
            .inspect_err(|e| error!("error deleting project: {:?}", e))?;

        if res.rows_affected() == 0 {
            return Err(ProjectError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_data() -> RepoData {
        serde_json::from_str(
            r#"{
                "id": 10270250,
                "html_url": "https://github.com/facebook/react",
                "stargazers_count": 218000,
                "forks_count": 45000,
                "open_issues_count": 1200,
                "description": "The library for web and native user interfaces.",
                "language": "JavaScript"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn create_maps_repo_fields() {
        let path: RepoPath = "facebook/react".parse().unwrap();
        let insert = ProjectCreate::from_repo(&path, &repo_data());

        assert_eq!(insert.owner, "facebook");
        assert_eq!(insert.name, "react");
        assert_eq!(insert.url, "https://github.com/facebook/react");
        assert_eq!(insert.stars, 218000);
        assert_eq!(insert.forks, 45000);
        assert_eq!(insert.issues, 1200);
        assert_eq!(insert.gh_id, 10270250);
        assert_eq!(insert.language.as_deref(), Some("JavaScript"));
    }

    #[test]
    fn sync_overwrites_with_nulls() {
        // A repo that dropped its description/language must clear ours too.
        let mut data = repo_data();
        data.description = None;
        data.language = None;

        let patch = ProjectSync::from_repo(Uuid::new_v4(), &data);
        assert!(patch.description.is_none());
        assert!(patch.language.is_none());
        assert_eq!(patch.stars, 218000);
    }
}
