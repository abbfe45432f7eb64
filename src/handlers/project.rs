use crate::github::{self, GithubError, RepoPath};
use crate::middlewares::auth::Auth;
use crate::models::project::{Project, ProjectError};
use crate::models::user::user_dao::IUser;
use crate::persisters::project::{
    ProjectById, ProjectByRepo, ProjectCreate, ProjectDelete, ProjectList, ProjectSync,
};
use crate::persisters::{Persist, Query};
use crate::state::AppState;

use actix_web::{delete, error, get, post, put, web, Error, HttpResponse, Result};
use sqlx::types::Uuid;

impl From<ProjectError> for Error {
    fn from(e: ProjectError) -> Self {
        match e {
            ProjectError::Unauthorized => error::ErrorUnauthorized("unauthorized"),
            ProjectError::AlreadyAdded => error::ErrorConflict("this repository is already added"),
            ProjectError::NotFound => error::ErrorNotFound("project not found"),
            ProjectError::NotOwner => error::ErrorForbidden("you do not own this project"),
            ProjectError::Github(e) => e.into(),
            ProjectError::Sqlx(e) => {
                log::error!("sql error: {:?}", e);
                error::ErrorInternalServerError("unknown error")
            }
        }
    }
}

impl From<GithubError> for Error {
    fn from(e: GithubError) -> Self {
        match e {
            GithubError::NotFound => error::ErrorNotFound("repository not found or private"),
            GithubError::Forbidden => error::ErrorForbidden(
                "access to the repository is forbidden; it may be private and need a GitHub token",
            ),
            GithubError::BadCredentials => {
                error::ErrorUnauthorized("GitHub rejected the stored token; sign in with GitHub again")
            }
            GithubError::RateLimited => error::ErrorTooManyRequests(
                "GitHub API rate limit exceeded; try again later or sign in with GitHub",
            ),
            GithubError::Status(s) => {
                log::error!("unexpected GitHub API status: {}", s);
                error::ErrorInternalServerError("error fetching repository data from GitHub")
            }
            GithubError::Comms(e) => {
                log::error!("GitHub comms error: {:?}", e);
                error::ErrorInternalServerError("error fetching repository data from GitHub")
            }
        }
    }
}

#[get("")]
async fn list(auth: Auth, state: AppState) -> Result<web::Json<Vec<Project>>> {
    let res = ProjectList.fetch(Some(&auth), &state).await?;
    Ok(web::Json(res))
}

#[derive(Deserialize, Debug)]
pub struct CreateProject {
    pub repo_path: String,
}

#[post("")]
async fn create(
    form: web::Json<CreateProject>,
    auth: Auth,
    state: AppState,
) -> Result<HttpResponse> {
    let form = form.into_inner();

    let path: RepoPath = form
        .repo_path
        .parse()
        .map_err(|_| error::ErrorBadRequest("invalid repository path (expected owner/name)"))?;

    // The session user's stored GitHub token unlocks private repos.
    let user = state
        .get_ref()
        .find_by_id(&auth.claims.sub)
        .await
        .map_err(ProjectError::Sqlx)?
        .ok_or_else(|| error::ErrorNotFound("user not found"))?;

    let existing = ProjectByRepo {
        owner: &path.owner,
        name: &path.name,
    }
    .fetch(Some(&auth), &state)
    .await?;

    if existing.is_some() {
        return Err(ProjectError::AlreadyAdded.into());
    }

    let data = github::fetch_repo(&path, user.github_token()).await?;

    let project = ProjectCreate::from_repo(&path, &data)
        .persist(Some(&auth), &state)
        .await?;

    Ok(HttpResponse::Created().json(project))
}

#[put("/{id}")]
async fn sync(id: web::Path<Uuid>, auth: Auth, state: AppState) -> Result<web::Json<Project>> {
    let id = id.into_inner();

    let project = ProjectById(id).fetch(Some(&auth), &state).await?;
    if project.user_id != auth.claims.sub {
        return Err(ProjectError::NotOwner.into());
    }

    let token = state
        .get_ref()
        .find_by_id(&auth.claims.sub)
        .await
        .map_err(ProjectError::Sqlx)?
        .and_then(|u| u.gh_token)
        .filter(|t| !t.is_empty());

    let path = RepoPath {
        owner: project.owner.clone(),
        name: project.name.clone(),
    };

    // Nothing is written unless the fetch succeeds; a 404/403/429 from GitHub
    // leaves the stored row exactly as it was.
    let data = github::fetch_repo(&path, token.as_deref()).await?;

    let updated = ProjectSync::from_repo(id, &data)
        .persist(Some(&auth), &state)
        .await?;

    Ok(web::Json(updated))
}

#[delete("/{id}")]
async fn remove(id: web::Path<Uuid>, auth: Auth, state: AppState) -> Result<HttpResponse> {
    let id = id.into_inner();

    let project = ProjectById(id).fetch(Some(&auth), &state).await?;
    if project.user_id != auth.claims.sub {
        return Err(ProjectError::NotOwner.into());
    }

    ProjectDelete(id).persist(Some(&auth), &state).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "project deleted" })))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(list);
    cfg.service(create);
    cfg.service(sync);
    cfg.service(remove);
}
