use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role. Admins hold every moderation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// A registered account.
///
/// `lock_expires_at` is set iff the account was locked with a duration.
/// A locked account whose expiry has passed is a stale lock: the first
/// reconciling read clears both fields in storage (see `db::users`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2 digest, opaque outside the credential service
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub is_locked: bool,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub spam_warnings: i64,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            role: Role::User,
            created_at: Utc::now(),
            is_locked: false,
            lock_expires_at: None,
            spam_warnings: 0,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the lock is in force right now (stale locks don't count).
    pub fn lock_in_force(&self, now: DateTime<Utc>) -> bool {
        self.is_locked && self.lock_expires_at.map(|exp| exp > now).unwrap_or(true)
    }

    /// True when the persisted lock has outlived its expiry.
    pub fn lock_is_stale(&self, now: DateTime<Utc>) -> bool {
        self.is_locked && self.lock_expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}

/// Request to register a new account
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.username.chars().count() < 3 || self.username.chars().count() > 50 {
            return Err("username must be 3-50 characters");
        }
        if !looks_like_email(&self.email) {
            return Err("email is not a valid address");
        }
        if self.password.chars().count() < 8 {
            return Err("password must be at least 8 characters");
        }
        Ok(())
    }
}

/// Minimal shape check; real deliverability is the mail system's problem
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user (no credential material)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub is_locked: bool,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub spam_warnings: i64,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
            is_locked: user.is_locked,
            lock_expires_at: user.lock_expires_at,
            spam_warnings: user.spam_warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_lock_in_force_future_expiry() {
        let mut user = User::new("a".repeat(3), "a@x.com".into(), "h".into());
        user.is_locked = true;
        user.lock_expires_at = Some(Utc::now() + Duration::hours(1));
        assert!(user.lock_in_force(Utc::now()));
        assert!(!user.lock_is_stale(Utc::now()));
    }

    #[test]
    fn test_stale_lock_detected() {
        let mut user = User::new("ghost".into(), "g@x.com".into(), "h".into());
        user.is_locked = true;
        user.lock_expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(!user.lock_in_force(Utc::now()));
        assert!(user.lock_is_stale(Utc::now()));
    }

    #[test]
    fn test_lock_without_expiry_is_indefinite() {
        let mut user = User::new("ghost".into(), "g@x.com".into(), "h".into());
        user.is_locked = true;
        assert!(user.lock_in_force(Utc::now()));
        assert!(!user.lock_is_stale(Utc::now()));
    }

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            username: "ghost_user".into(),
            email: "ghost@x.com".into(),
            password: "longenough".into(),
        };
        assert!(ok.validate().is_ok());

        let short_name = RegisterRequest { username: "ab".into(), ..rq() };
        assert!(short_name.validate().is_err());

        let bad_email = RegisterRequest { email: "not-an-email".into(), ..rq() };
        assert!(bad_email.validate().is_err());

        let short_pw = RegisterRequest { password: "1234567".into(), ..rq() };
        assert!(short_pw.validate().is_err());
    }

    fn rq() -> RegisterRequest {
        RegisterRequest {
            username: "ghost_user".into(),
            email: "ghost@x.com".into(),
            password: "longenough".into(),
        }
    }
}
