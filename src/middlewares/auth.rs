use crate::handlers::auth::{decode_jwt, Claims};
use crate::CONFIG;

use actix_web::{dev, error, FromRequest, HttpRequest};
use futures::future::{err, ok, Ready};

/// Session extractor. Pulls the JWT out of the `Authorization: Bearer` header
/// and validates it before the handler runs. No DB round-trip happens here;
/// ownership checks live in the handlers and the SQL they run.
#[derive(Debug)]
pub struct Auth {
    pub claims: Claims,
}

#[derive(Debug)]
pub enum AuthError {
    NoAuthHeader,
    InvalidToken(jsonwebtoken::errors::Error),
}

impl From<AuthError> for actix_web::Error {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NoAuthHeader => {
                error::ErrorUnauthorized("no Authorization header included in request")
            }
            AuthError::InvalidToken(e) => {
                log::error!("unauthorized request; invalid JWT: {:?}", e);
                error::ErrorUnauthorized("invalid session token")
            }
        }
    }
}

impl FromRequest for Auth {
    type Error = AuthError;
    type Future = Ready<Result<Auth, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut dev::Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| {
                let words = h.split("Bearer").collect::<Vec<&str>>();
                words.get(1).map(|w| w.trim().to_string())
            });

        match token {
            Some(tok) => match decode_jwt(&tok, CONFIG.jwt_secret.as_bytes()) {
                Ok(claims) => ok(Auth { claims }),
                Err(e) => err(AuthError::InvalidToken(e)),
            },
            None => err(AuthError::NoAuthHeader),
        }
    }
}
