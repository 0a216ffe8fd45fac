//! Runtime configuration from flags, environment variables and `.env`.
use std::net::SocketAddr;
use std::path::PathBuf;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use clap::Parser;
use thiserror::Error;

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_CSRF_MINUTES: u64 = 120;
pub const DEFAULT_RESET_MINUTES: u64 = 4320;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be set (or run with --dev)")]
    MissingSecret { name: &'static str },

    #[error("{name} must be at least {MIN_SECRET_LEN} bytes")]
    SecretTooShort { name: &'static str },

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Failed to determine data directory")]
    NoDataDir,
}

/// pathfork - a writing organizer for works, sections, characters and settings
#[derive(Debug, Clone, Parser)]
#[command(name = "pathfork")]
#[command(about = "A writing organizer for works, sections, characters and settings")]
#[command(version)]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "PATHFORK_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite database file (defaults to the user data directory)
    #[arg(long, env = "PATHFORK_DATABASE", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Secret used to sign session cookies
    #[arg(long, env = "PATHFORK_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Secret used to sign verification, reset and CSRF tokens
    #[arg(long, env = "PATHFORK_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// How long a rendered form stays submittable
    #[arg(long, env = "PATHFORK_CSRF_MINUTES", default_value_t = DEFAULT_CSRF_MINUTES)]
    pub csrf_minutes: u64,

    /// How long a password reset link stays valid
    #[arg(long, env = "PATHFORK_RESET_MINUTES", default_value_t = DEFAULT_RESET_MINUTES)]
    pub reset_minutes: u64,

    /// Public URL used in emailed links
    #[arg(long, env = "PATHFORK_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// SendGrid API key; without one, emails are only logged
    #[arg(long, env = "SENDGRID_API_KEY", hide_env_values = true)]
    pub sendgrid_api_key: Option<String>,

    /// Address emails are sent from and contact notes are sent to
    #[arg(long, env = "PATHFORK_SITE_INBOX", default_value = "pathforkapp@gmail.com")]
    pub site_inbox: String,

    /// Directory served under /static
    #[arg(long, env = "PATHFORK_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Development mode: generate missing secrets
    #[arg(long, env = "PATHFORK_DEV")]
    pub dev: bool,
}

/// Validated settings the application runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub database_path: PathBuf,
    pub session_secret: Vec<u8>,
    pub token_secret: Vec<u8>,
    pub csrf_max_age_minutes: u64,
    pub reset_max_age_minutes: u64,
    pub base_url: String,
    pub sendgrid_api_key: Option<String>,
    pub site_inbox: String,
    pub static_dir: PathBuf,
}

impl Settings {
    /// Settings with defaults everywhere except the two secrets.
    pub fn new(session_secret: impl Into<Vec<u8>>, token_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_path: PathBuf::from("pathfork.db"),
            session_secret: session_secret.into(),
            token_secret: token_secret.into(),
            csrf_max_age_minutes: DEFAULT_CSRF_MINUTES,
            reset_max_age_minutes: DEFAULT_RESET_MINUTES,
            base_url: "http://localhost:8080".to_string(),
            sendgrid_api_key: None,
            site_inbox: "pathforkapp@gmail.com".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Config {
    /// Validates the raw configuration.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let address = format!("{}:{}", self.host, self.port);
        let listen_addr = address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(address.clone()))?;

        let database_path = match &self.database {
            Some(path) => path.clone(),
            None => default_database_path()?,
        };

        let session_secret = secret(
            "PATHFORK_SESSION_SECRET",
            self.session_secret.as_deref(),
            self.dev,
        )?;
        let token_secret = secret("PATHFORK_TOKEN_SECRET", self.token_secret.as_deref(), self.dev)?;

        Ok(Settings {
            listen_addr,
            database_path,
            session_secret,
            token_secret,
            csrf_max_age_minutes: self.csrf_minutes,
            reset_max_age_minutes: self.reset_minutes,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            sendgrid_api_key: self.sendgrid_api_key.clone().filter(|key| !key.is_empty()),
            site_inbox: self.site_inbox.clone(),
            static_dir: self.static_dir.clone(),
        })
    }
}

/// Returns `{data_dir}/pathfork/pathfork.db`.
pub fn default_database_path() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(data_dir.join("pathfork").join("pathfork.db"))
}

fn secret(name: &'static str, value: Option<&str>, dev: bool) -> Result<Vec<u8>, ConfigError> {
    match value {
        Some(value) if value.len() >= MIN_SECRET_LEN => Ok(value.as_bytes().to_vec()),
        Some(_) => Err(ConfigError::SecretTooShort { name }),
        None if dev => {
            tracing::warn!("{} not set, using a generated secret", name);
            let mut bytes = vec![0u8; MIN_SECRET_LEN];
            OsRng.fill_bytes(&mut bytes);
            Ok(bytes)
        }
        None => Err(ConfigError::MissingSecret { name }),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["pathfork"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    #[serial]
    fn secrets_are_required_outside_dev() {
        let config = parse(&["--database", "x.db"]);

        assert_eq!(
            config.settings().unwrap_err(),
            ConfigError::MissingSecret {
                name: "PATHFORK_SESSION_SECRET"
            }
        );
    }

    #[test]
    #[serial]
    fn short_secrets_are_rejected() {
        let config = parse(&[
            "--database",
            "x.db",
            "--session-secret",
            "short",
            "--token-secret",
            SECRET,
        ]);

        assert_eq!(
            config.settings().unwrap_err(),
            ConfigError::SecretTooShort {
                name: "PATHFORK_SESSION_SECRET"
            }
        );
    }

    #[test]
    #[serial]
    fn dev_mode_generates_secrets() {
        let settings = parse(&["--dev", "--database", "x.db"]).settings().unwrap();

        assert_eq!(settings.session_secret.len(), MIN_SECRET_LEN);
        assert_ne!(settings.session_secret, settings.token_secret);
    }

    #[test]
    #[serial]
    fn environment_fills_in_flags() {
        unsafe {
            std::env::set_var("PORT", "9123");
            std::env::set_var("PATHFORK_SESSION_SECRET", SECRET);
            std::env::set_var("PATHFORK_TOKEN_SECRET", SECRET);
        }

        let settings = parse(&["--database", "x.db", "--base-url", "https://pathfork.test/"])
            .settings()
            .unwrap();

        unsafe {
            std::env::remove_var("PORT");
            std::env::remove_var("PATHFORK_SESSION_SECRET");
            std::env::remove_var("PATHFORK_TOKEN_SECRET");
        }

        assert_eq!(settings.listen_addr.port(), 9123);
        assert_eq!(settings.session_secret, SECRET.as_bytes());
        assert_eq!(settings.base_url, "https://pathfork.test");
        assert_eq!(settings.csrf_max_age_minutes, DEFAULT_CSRF_MINUTES);
        assert_eq!(settings.reset_max_age_minutes, DEFAULT_RESET_MINUTES);
    }

    #[test]
    #[serial]
    fn invalid_host_is_reported() {
        let config = parse(&["--host", "not a host", "--dev", "--database", "x.db"]);

        assert!(matches!(
            config.settings(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
