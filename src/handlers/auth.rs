use crate::models::user::user_dao::{IUser, UserInsertError};
use crate::state::AppState;
use crate::CONFIG;

use actix_web::{error, post, web, Error, HttpResponse, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::types::Uuid;
use validator::Validate;

/// Session claims. `gh` carries the user's GitHub access token when they
/// signed in through GitHub, so handlers can reach it without a DB trip.
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gh: Option<String>,
}

pub fn generate_jwt(
    user_id: Uuid,
    gh_token: Option<&str>,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp: DateTime<Utc> = Utc::now() + Duration::days(30);

    let claims = Claims {
        sub: user_id,
        exp: exp.timestamp(),
        gh: gh_token.map(str::to_string),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

pub fn decode_jwt(token: &str, secret: &[u8]) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
}

impl From<UserInsertError> for Error {
    fn from(e: UserInsertError) -> Self {
        match e {
            UserInsertError::AlreadyExists => {
                error::ErrorConflict("a user with this email already exists")
            }
            UserInsertError::Sqlx(e) => {
                log::error!("error inserting user: {:?}", e);
                error::ErrorInternalServerError("could not create user")
            }
        }
    }
}

#[derive(Deserialize, Validate, Debug)]
pub struct RegisterForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[post("/register")]
async fn register(form: web::Json<RegisterForm>, state: AppState) -> Result<HttpResponse> {
    let form = form.into_inner();
    form.validate()
        .map_err(|e| error::ErrorBadRequest(e.to_string()))?;

    let hash = bcrypt::hash(&form.password, bcrypt::DEFAULT_COST).map_err(|e| {
        log::error!("error hashing password: {:?}", e);
        error::ErrorInternalServerError("could not create user")
    })?;

    let user_id = state.get_ref().insert_credentials(&form.email, &hash).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "user created",
        "user_id": user_id,
    })))
}

#[derive(Deserialize, Debug)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[post("/login")]
async fn login(form: web::Json<LoginForm>, state: AppState) -> Result<HttpResponse> {
    let form = form.into_inner();

    let user = state
        .get_ref()
        .find_by_email(&form.email)
        .await
        .map_err(|e| {
            log::error!("error looking up user at login: {:?}", e);
            error::ErrorInternalServerError("could not log in")
        })?;

    // One generic 401 regardless of whether the email is unknown, the account
    // is OAuth-only, or the password is wrong.
    let user = user.ok_or_else(|| error::ErrorUnauthorized("invalid email or password"))?;

    let valid = !user.password.is_empty()
        && bcrypt::verify(&form.password, &user.password)
            .inspect_err(|e| log::error!("bcrypt verify failed: {:?}", e))
            .unwrap_or(false);

    if !valid {
        return Err(error::ErrorUnauthorized("invalid email or password"));
    }

    let jwt = generate_jwt(user.id, user.github_token(), CONFIG.jwt_secret.as_bytes())
        .map_err(LoginError::Jwt)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": jwt })))
}

#[derive(Deserialize, Debug)]
pub struct GithubLogin {
    code: String,
}

#[post("/github")]
async fn github(form: web::Query<GithubLogin>, state: AppState) -> Result<HttpResponse> {
    let form = form.into_inner();
    let jwt = github_sign_in(form.code, &state).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": jwt })))
}

/// Full GitHub sign-in: code -> access token -> profile + primary email ->
/// create-or-update the user -> session JWT.
async fn github_sign_in(code: String, state: &AppState) -> Result<String, LoginError> {
    let access_token = get_access_token(&code).await.map_err(|e| {
        log::error!("error retrieving GitHub access token: {:?}", e);
        LoginError::AccessTokenNotGranted
    })?;

    let (user_info, emails) = get_user_info(&access_token).await.map_err(|e| {
        log::error!("error retrieving GitHub user info: {:?}", e);
        LoginError::UserInfoNotAvailable
    })?;

    let primary_email = emails
        .into_iter()
        .find(|e| e.primary)
        .ok_or(LoginError::NoPrimaryEmail)?;

    let user_id = state
        .get_ref()
        .upsert_github(
            &primary_email.email,
            &user_info.id.to_string(),
            &access_token,
        )
        .await?;

    let jwt = generate_jwt(
        user_id,
        Some(access_token.as_str()),
        CONFIG.jwt_secret.as_bytes(),
    )?;

    Ok(jwt)
}

#[derive(Deserialize, Debug)]
struct GithubAccessTokenResponse {
    access_token: String,
}

async fn get_access_token(code: &str) -> Result<String, LoginError> {
    let client = reqwest::Client::new();

    let res = client
        .post("https://github.com/login/oauth/access_token")
        .header(reqwest::header::ACCEPT, "application/json")
        .query(&[
            ("client_id", &CONFIG.gh_client_id),
            ("client_secret", &CONFIG.gh_client_secret),
            ("code", &code.to_string()),
        ])
        .send()
        .await?
        .json::<GithubAccessTokenResponse>()
        .await?;

    Ok(res.access_token)
}

#[derive(Deserialize, Debug)]
struct GithubUserInfo {
    id: i64,
}

#[derive(Deserialize, Debug)]
struct GithubEmail {
    email: String,
    primary: bool,
}

async fn get_user_info(
    access_token: &str,
) -> Result<(GithubUserInfo, Vec<GithubEmail>), LoginError> {
    let client = reqwest::Client::new();

    let user = client
        .get("https://api.github.com/user")
        .header(reqwest::header::USER_AGENT, &CONFIG.gh_user_agent)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", access_token),
        )
        .send()
        .await?
        .json::<GithubUserInfo>()
        .await?;

    let emails = client
        .get("https://api.github.com/user/emails")
        .header(reqwest::header::USER_AGENT, &CONFIG.gh_user_agent)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", access_token),
        )
        .send()
        .await?
        .json::<Vec<GithubEmail>>()
        .await?;

    Ok((user, emails))
}

#[derive(Debug)]
pub enum LoginError {
    GhComms(reqwest::Error),
    Jwt(jsonwebtoken::errors::Error),
    UserUpsert(UserInsertError),
    AccessTokenNotGranted,
    UserInfoNotAvailable,
    NoPrimaryEmail,
}

impl From<reqwest::Error> for LoginError {
    fn from(e: reqwest::Error) -> Self {
        Self::GhComms(e)
    }
}

impl From<UserInsertError> for LoginError {
    fn from(e: UserInsertError) -> Self {
        Self::UserUpsert(e)
    }
}

impl From<jsonwebtoken::errors::Error> for LoginError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

impl From<LoginError> for Error {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::GhComms(e) => {
                log::error!("GitHub comms error during sign-in: {:?}", e);
                error::ErrorInternalServerError("unable to sign in with GitHub")
            }
            LoginError::Jwt(e) => {
                log::error!("error generating session JWT: {:?}", e);
                error::ErrorInternalServerError("unable to sign in")
            }
            LoginError::UserUpsert(UserInsertError::AlreadyExists) => error::ErrorConflict(
                "this GitHub account is already linked to another user",
            ),
            LoginError::UserUpsert(UserInsertError::Sqlx(e)) => {
                log::error!("error upserting user during GitHub sign-in: {:?}", e);
                error::ErrorInternalServerError("unable to sign in with GitHub")
            }
            LoginError::AccessTokenNotGranted => {
                error::ErrorInternalServerError("GitHub did not grant an access token")
            }
            LoginError::UserInfoNotAvailable => error::ErrorInternalServerError(
                "unable to sign in with GitHub; user information not available",
            ),
            LoginError::NoPrimaryEmail => error::ErrorInternalServerError(
                "unable to sign in with GitHub; primary email not available",
            ),
        }
    }
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(register);
    cfg.service(login);
    cfg.service(github);
}
