//! Client for the GitHub repository API.
//!
//! One job: turn an `owner/name` path into the handful of repo stats we
//! store. Public repos are fetched anonymously; if GitHub answers 403 or 404
//! (the status it gives for private repos), the fetch is retried once with
//! the caller's stored token, falling back to the server-wide token.

use crate::CONFIG;

use reqwest::StatusCode;
use std::fmt;
use std::str::FromStr;

/// The subset of `GET /repos/{owner}/{name}` we persist.
#[derive(Deserialize, Debug, Clone)]
pub struct RepoData {
    pub id: i64,
    pub html_url: String,
    pub stargazers_count: i32,
    pub forks_count: i32,
    pub open_issues_count: i32,
    pub description: Option<String>,
    pub language: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum GithubError {
    #[error("repository not found")]
    NotFound,
    #[error("access to repository forbidden")]
    Forbidden,
    #[error("GitHub rejected the supplied token")]
    BadCredentials,
    #[error("GitHub API rate limit exceeded")]
    RateLimited,
    #[error("unexpected GitHub API status: {0}")]
    Status(StatusCode),
    #[error("error communicating with GitHub: {0}")]
    Comms(#[from] reqwest::Error),
}

/// An `owner/name` pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPath {
    pub owner: String,
    pub name: String,
}

#[derive(Debug)]
pub struct InvalidRepoPath;

fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl FromStr for RepoPath {
    type Err = InvalidRepoPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if valid_segment(owner) && valid_segment(name) => Ok(RepoPath {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(InvalidRepoPath),
        }
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Fetch current stats for `path`, retrying once with a token if the
/// anonymous attempt is refused.
pub async fn fetch_repo(path: &RepoPath, user_token: Option<&str>) -> Result<RepoData, GithubError> {
    let res = repo_request(path, None).await?;
    if res.status().is_success() {
        return Ok(res.json::<RepoData>().await?);
    }

    let status = res.status();
    if status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND {
        // The repo may be private. Private repos surface as 404 (or 403) to
        // anonymous callers, so one more attempt with whatever token we have.
        let token = user_token
            .map(str::to_string)
            .or_else(|| CONFIG.gh_fallback_token.clone());

        if let Some(token) = token {
            let res = repo_request(path, Some(&token)).await?;
            if res.status().is_success() {
                return Ok(res.json::<RepoData>().await?);
            }
            return Err(status_error(res.status()));
        }
    }

    Err(status_error(status))
}

async fn repo_request(
    path: &RepoPath,
    token: Option<&str>,
) -> Result<reqwest::Response, GithubError> {
    let client = reqwest::Client::new();

    let mut req = client
        .get(format!(
            "https://api.github.com/repos/{}/{}",
            path.owner, path.name
        ))
        .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
        .header(reqwest::header::USER_AGENT, &CONFIG.gh_user_agent);

    if let Some(token) = token {
        req = req.header(reqwest::header::AUTHORIZATION, format!("token {}", token));
    }

    Ok(req.send().await?)
}

fn status_error(status: StatusCode) -> GithubError {
    match status {
        StatusCode::NOT_FOUND => GithubError::NotFound,
        StatusCode::FORBIDDEN => GithubError::Forbidden,
        StatusCode::UNAUTHORIZED => GithubError::BadCredentials,
        StatusCode::TOO_MANY_REQUESTS => GithubError::RateLimited,
        s => GithubError::Status(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repo_path() {
        let path: RepoPath = "facebook/react".parse().unwrap();
        assert_eq!(path.owner, "facebook");
        assert_eq!(path.name, "react");
        assert_eq!(path.to_string(), "facebook/react");
    }

    #[test]
    fn accepts_dots_dashes_underscores() {
        assert!("rust-lang/rust.vim".parse::<RepoPath>().is_ok());
        assert!("foo_bar/baz-1.0".parse::<RepoPath>().is_ok());
    }

    #[test]
    fn rejects_malformed_repo_paths() {
        assert!("".parse::<RepoPath>().is_err());
        assert!("no-slash".parse::<RepoPath>().is_err());
        assert!("/react".parse::<RepoPath>().is_err());
        assert!("facebook/".parse::<RepoPath>().is_err());
        assert!("a/b/c".parse::<RepoPath>().is_err());
        assert!("owner/na me".parse::<RepoPath>().is_err());
    }

    #[test]
    fn maps_statuses_to_errors() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND),
            GithubError::NotFound
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN),
            GithubError::Forbidden
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED),
            GithubError::BadCredentials
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS),
            GithubError::RateLimited
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY),
            GithubError::Status(_)
        ));
    }

    #[test]
    fn deserializes_repo_payload() {
        let body = r#"{
            "id": 10270250,
            "full_name": "facebook/react",
            "html_url": "https://github.com/facebook/react",
            "stargazers_count": 218000,
            "forks_count": 45000,
            "open_issues_count": 1200,
            "description": "The library for web and native user interfaces.",
            "language": "JavaScript",
            "private": false
        }"#;

        let repo: RepoData = serde_json::from_str(body).unwrap();
        assert_eq!(repo.id, 10270250);
        assert_eq!(repo.stargazers_count, 218000);
        assert_eq!(repo.language.as_deref(), Some("JavaScript"));
    }

    #[test]
    fn repo_payload_tolerates_missing_optionals() {
        let body = r#"{
            "id": 1,
            "html_url": "https://github.com/foo/bar",
            "stargazers_count": 0,
            "forks_count": 0,
            "open_issues_count": 0,
            "description": null,
            "language": null
        }"#;

        let repo: RepoData = serde_json::from_str(body).unwrap();
        assert!(repo.description.is_none());
        assert!(repo.language.is_none());
    }
}
