//! Credential service: password digests and signed bearer tokens, plus the
//! request extractors that resolve an actor from the Authorization header.
//!
//! Tokens are symmetric HS256; a token is trusted iff it decodes and passes
//! expiry. Rotation and revocation are out of scope.

use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    authz::{self, Capability},
    error::AppError,
    models::User,
    AppState,
};

/// Hash a password into a salted, one-way argon2 digest
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Signed token payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// "refresh" on refresh tokens; absent on access tokens. The marker
    /// keeps a refresh token from being replayed as an access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        self.typ.as_deref() == Some("refresh")
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_minutes: i64,
    refresh_days: i64,
}

impl TokenService {
    pub fn new(secret: &str, access_minutes: i64, refresh_days: i64) -> Self {
        TokenService {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_minutes,
            refresh_days,
        }
    }

    pub fn issue_access_token(&self, user_id: &str) -> Result<String, AppError> {
        self.issue(user_id, Duration::minutes(self.access_minutes), None)
    }

    pub fn issue_refresh_token(&self, user_id: &str) -> Result<String, AppError> {
        self.issue(
            user_id,
            Duration::days(self.refresh_days),
            Some("refresh".to_string()),
        )
    }

    fn issue(&self, user_id: &str, ttl: Duration, typ: Option<String>) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            typ,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow!("token signing failed: {e}")))
    }

    /// Decode and verify signature + expiry. Any failure is
    /// `Unauthenticated`, not a fatal condition.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthenticated("Invalid Authorization header format".to_string()))
}

/// Authenticated actor resolved from a bearer token.
///
/// Resolution always uses the reconciling read, so a stale lock observed
/// here is healed in storage before the request proceeds. A lock still in
/// force rejects the request with the expiry attached.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl std::ops::Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        let token = bearer_token(parts)?;
        let claims = app.tokens.decode(token)?;
        if claims.is_refresh() {
            return Err(AppError::Unauthenticated(
                "Refresh token cannot be used for access".to_string(),
            ));
        }

        let user = app
            .boards
            .default_partition()
            .get_user_reconciled(&claims.sub)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::Unauthenticated("Unknown user".to_string()),
                other => other,
            })?;

        if user.lock_in_force(Utc::now()) {
            return match user.lock_expires_at {
                Some(expires_at) => Err(AppError::AccountLocked(expires_at)),
                None => Err(AppError::Forbidden("Account is locked".to_string())),
            };
        }

        Ok(CurrentUser(user))
    }
}

/// Authenticated actor that additionally holds the admin panel capability
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub User);

impl std::ops::Deref for CurrentAdmin {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        authz::require(&user, Capability::AccessAdminPanel, None)?;
        Ok(CurrentAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TokenService {
        TokenService::new("test-secret", 30, 7)
    }

    #[test]
    fn test_hash_and_verify() {
        let digest = hash_password("correct horse battery").unwrap();
        assert_ne!(digest, "correct horse battery");
        assert!(verify_password("correct horse battery", &digest));
        assert!(!verify_password("wrong password", &digest));
        assert!(!verify_password("anything", "not-a-digest"));
    }

    #[test]
    fn test_hashing_salts() {
        let a = hash_password("same input").unwrap();
        let b = hash_password("same input").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same input", &a));
        assert!(verify_password("same input", &b));
    }

    #[test]
    fn test_access_token_round_trip() {
        let svc = tokens();
        let token = svc.issue_access_token("user-1").unwrap();
        let claims = svc.decode(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(!claims.is_refresh());
        // Expiry sits ~30 minutes out
        let ttl = claims.exp - claims.iat;
        assert_eq!(ttl, 30 * 60);
    }

    #[test]
    fn test_refresh_token_carries_marker() {
        let svc = tokens();
        let token = svc.issue_refresh_token("user-1").unwrap();
        let claims = svc.decode(&token).unwrap();
        assert!(claims.is_refresh());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = tokens();
        let other = TokenService::new("different-secret", 30, 7);
        let token = other.issue_access_token("user-1").unwrap();
        assert!(matches!(
            svc.decode(&token).unwrap_err(),
            AppError::Unauthenticated(_)
        ));
        assert!(matches!(
            svc.decode("garbage.token.here").unwrap_err(),
            AppError::Unauthenticated(_)
        ));
    }
}
