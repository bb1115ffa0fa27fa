use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Symmetric signing secret for access and refresh tokens
    pub jwt_secret: String,
    /// Access token lifetime in minutes
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// Default account lock duration in hours when an admin gives none
    #[serde(default = "default_lock_hours")]
    pub default_lock_hours: i64,
    /// Hours without activity before a thread is considered dormant
    #[serde(default = "default_dormant_hours")]
    pub dormant_after_hours: i64,
    /// Interval between reclamation sweeps in seconds
    #[serde(default = "default_reclaim_interval")]
    pub reclaim_interval_secs: u64,
    /// Whether the reclamation task runs at all
    #[serde(default = "default_reclaim_enabled")]
    pub reclaim_enabled: bool,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_cors_origins() -> String { "*".to_string() }
fn default_access_token_minutes() -> i64 { 30 }
fn default_refresh_token_days() -> i64 { 7 }
fn default_lock_hours() -> i64 { 24 }
fn default_dormant_hours() -> i64 { 72 }
fn default_reclaim_interval() -> u64 { 3600 }
fn default_reclaim_enabled() -> bool { true }

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_port),
                cors_origins: std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| default_cors_origins()),
            },
            auth: AuthConfig {
                jwt_secret: std::env::var("JWT_SECRET")
                    .context("JWT_SECRET must be set")?,
                access_token_minutes: std::env::var("ACCESS_TOKEN_MINUTES")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_access_token_minutes),
                refresh_token_days: std::env::var("REFRESH_TOKEN_DAYS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_refresh_token_days),
            },
            moderation: ModerationConfig {
                default_lock_hours: std::env::var("DEFAULT_LOCK_HOURS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_lock_hours),
                dormant_after_hours: std::env::var("DORMANT_AFTER_HOURS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_dormant_hours),
                reclaim_interval_secs: std::env::var("RECLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_reclaim_interval),
                reclaim_enabled: std::env::var("RECLAIM_ENABLED")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_reclaim_enabled),
            },
        })
    }
}
