//! Process configuration.
//!
//! Everything environment-derived is read once at startup into an immutable
//! [`Config`] that is handed to the tool sets. Missing credentials are not an
//! error here; the tools needing them report `ConfigurationMissing` instead.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::upstream::SmtpSettings;

pub const BRAVE_API_KEY: &str = "BRAVE_API_KEY";
pub const BRAVE_API_URL: &str = "BRAVE_API_URL";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USER: &str = "SMTP_USER";
pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const TODOIST_EMAIL: &str = "TODOIST_EMAIL";
pub const ALLOWED_DIRS: &str = "TOOLBELT_ALLOWED_DIRS";
pub const HTTP_TIMEOUT_SECS: &str = "TOOLBELT_HTTP_TIMEOUT_SECS";
pub const COMMAND_TIMEOUT_SECS: &str = "TOOLBELT_COMMAND_TIMEOUT_SECS";
pub const SMTP_TIMEOUT_SECS: &str = "TOOLBELT_SMTP_TIMEOUT_SECS";

const DEFAULT_BRAVE_API_URL: &str = "https://api.search.brave.com";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;
/// One hour; anything longer is a typo.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    #[diagnostic(code(toolbelt::config::invalid_number))]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    #[diagnostic(code(toolbelt::config::zero_timeout))]
    ZeroTimeout { var: &'static str },

    #[error("{var} must be at most {max} seconds, got {value}")]
    #[diagnostic(code(toolbelt::config::timeout_too_large))]
    TimeoutTooLarge {
        var: &'static str,
        value: u64,
        max: u64,
    },
}

/// SMTP relay settings; each field may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub brave_api_key: Option<String>,
    pub brave_api_url: String,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub smtp: SmtpConfig,
    pub todoist_email: Option<String>,
    pub allowed_dirs: Vec<PathBuf>,
    pub http_timeout: Duration,
    pub command_timeout: Duration,
    pub smtp_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brave_api_key: None,
            brave_api_url: DEFAULT_BRAVE_API_URL.to_string(),
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            smtp: SmtpConfig {
                host: None,
                port: DEFAULT_SMTP_PORT,
                user: None,
                password: None,
            },
            todoist_email: None,
            allowed_dirs: Vec::new(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            smtp_timeout: Duration::from_secs(DEFAULT_SMTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var_os(key))
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let text = |key: &str| {
            lookup(key)
                .and_then(|v| v.into_string().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Config::default();

        Ok(Self {
            brave_api_key: text(BRAVE_API_KEY),
            brave_api_url: text(BRAVE_API_URL).unwrap_or(defaults.brave_api_url),
            github_token: text(GITHUB_TOKEN),
            github_api_url: text(GITHUB_API_URL).unwrap_or(defaults.github_api_url),
            smtp: SmtpConfig {
                host: text(SMTP_HOST),
                port: parse_number(SMTP_PORT, text(SMTP_PORT), DEFAULT_SMTP_PORT)?,
                user: text(SMTP_USER),
                password: text(SMTP_PASSWORD),
            },
            todoist_email: text(TODOIST_EMAIL),
            allowed_dirs: lookup(ALLOWED_DIRS)
                .map(|v| env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect())
                .unwrap_or_default(),
            http_timeout: parse_timeout(HTTP_TIMEOUT_SECS, text(HTTP_TIMEOUT_SECS), DEFAULT_HTTP_TIMEOUT_SECS)?,
            command_timeout: parse_timeout(
                COMMAND_TIMEOUT_SECS,
                text(COMMAND_TIMEOUT_SECS),
                DEFAULT_COMMAND_TIMEOUT_SECS,
            )?,
            smtp_timeout: parse_timeout(SMTP_TIMEOUT_SECS, text(SMTP_TIMEOUT_SECS), DEFAULT_SMTP_TIMEOUT_SECS)?,
        })
    }

    /// Append extra allow-list roots (e.g. from the command line).
    pub fn with_allowed_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.allowed_dirs.extend(dirs);
        self
    }

    /// Complete SMTP settings, or the names of the variables still missing.
    pub fn smtp_settings(&self) -> Result<SmtpSettings, Vec<&'static str>> {
        match (&self.smtp.host, &self.smtp.user, &self.smtp.password) {
            (Some(host), Some(user), Some(password)) => Ok(SmtpSettings {
                host: host.clone(),
                port: self.smtp.port,
                user: user.clone(),
                password: password.clone(),
                timeout: self.smtp_timeout,
            }),
            (host, user, password) => Err([
                (host.is_none(), SMTP_HOST),
                (user.is_none(), SMTP_USER),
                (password.is_none(), SMTP_PASSWORD),
            ]
            .into_iter()
            .filter_map(|(missing, name)| missing.then_some(name))
            .collect()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    var: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: v }),
    }
}

fn parse_timeout(
    var: &'static str,
    value: Option<String>,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    let secs = parse_number(var, value, default_secs)?;
    if secs == 0 {
        return Err(ConfigError::ZeroTimeout { var });
    }
    if secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::TimeoutTooLarge {
            var,
            value: secs,
            max: MAX_TIMEOUT_SECS,
        });
    }
    Ok(Duration::from_secs(secs))
}
