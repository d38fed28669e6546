use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

pub const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub session_hours: i64,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: String,
    pub triage_timeout: Duration,
    pub workflow_url: Option<String>,
    pub seed: bool,
    pub seed_admin_password: String,
    pub seed_user_password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: var_or("HELPDESK_HOST", "0.0.0.0"),
            port: parsed("HELPDESK_PORT", 3000)?,
            db_path: PathBuf::from(var_or("HELPDESK_DB_PATH", "helpdesk.db")),
            jwt_secret: var_or("HELPDESK_JWT_SECRET", PLACEHOLDER_SECRET),
            session_hours: parsed("HELPDESK_SESSION_HOURS", 24)?,
            cookie_secure: parsed("HELPDESK_COOKIE_SECURE", false)?,
            cors_origins: var_or("HELPDESK_CORS_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL"),
            openai_model: var_or("OPENAI_MODEL", "gpt-3.5-turbo"),
            triage_timeout: Duration::from_secs(parsed("HELPDESK_TRIAGE_TIMEOUT_SECS", 8)?),
            workflow_url: non_empty("HELPDESK_WORKFLOW_URL"),
            seed: parsed("HELPDESK_SEED", true)?,
            seed_admin_password: var_or("HELPDESK_SEED_ADMIN_PASSWORD", "admin"),
            seed_user_password: var_or("HELPDESK_SEED_USER_PASSWORD", "user123"),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
