//! Bearer-token authentication: sign-in endpoint and request middleware.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// How long an issued token stays valid, in hours.
const TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User the token was issued to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens for a single configured user.
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    username: String,
    password: String,
}

impl Authenticator {
    pub fn new(secret: &str, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Checks credentials and returns a signed token for `username`.
    pub fn sign_in(&self, username: &str, password: &str) -> Result<String, ApiError> {
        if username != self.username || password != self.password {
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
        self.issue(username)
    }

    /// Signs a token for `subject` without checking credentials.
    pub fn issue(&self, subject: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {e}")))
    }

    /// Verifies signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ApiError::Unauthorized("Invalid token".to_string())
            })
    }
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
}

/// POST /auth/signin: exchange credentials for a token.
#[tracing::instrument(skip_all)]
pub async fn sign_in(
    State(auth): State<Arc<Authenticator>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>, ApiError> {
    let Json(req) = payload?;
    let token = auth.sign_in(&req.username, &req.password)?;
    tracing::info!(username = %req.username, "user signed in");
    Ok(Json(SignInResponse { token }))
}

/// Rejects requests without a valid bearer token.
///
/// Verified claims are attached to the request extensions.
pub async fn require_bearer(
    State(auth): State<Arc<Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;
    let claims = auth.verify(token)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let unauthorized = || ApiError::Unauthorized("Authorization header is missing".to_string());

    let header = headers.get(AUTHORIZATION).ok_or_else(unauthorized)?;
    let header = header.to_str().map_err(|_| unauthorized())?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new("test-secret", "demo", "demo")
    }

    #[test]
    fn issued_token_verifies() {
        let auth = authenticator();

        let token = auth.sign_in("demo", "demo").unwrap();
        let claims = auth.verify(&token).unwrap();

        assert_eq!(claims.sub, "demo");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn wrong_credentials_are_unauthorized() {
        let result = authenticator().sign_in("demo", "nope");
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = Authenticator::new("other-secret", "demo", "demo");
        let token = other.issue("demo").unwrap();

        assert!(matches!(
            authenticator().verify(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = authenticator();
        let past = Utc::now() - Duration::hours(48);
        let claims = Claims {
            sub: "demo".to_string(),
            iat: past.timestamp(),
            exp: (past + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &auth.encoding).unwrap();

        assert!(matches!(auth.verify(&token), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers).unwrap(), "abc.def");
    }
}
