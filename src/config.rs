//! Process settings and the delivery retry policy.
//!
//! [`Settings`] is the TOML-backed configuration consumed once at process
//! start: the SMTP endpoint and credentials, and the user-directory database
//! location. [`RetryPolicy`] is independent of the settings file — it is an
//! explicit value passed into the notification pipeline so tests and callers
//! can substitute a different attempt count or backoff strategy without
//! touching any call site.
//!
//! Example `config.toml`:
//!
//! ```toml
//! [email]
//! smtp_server     = "smtp.example.com"
//! smtp_port       = 465
//! sender_email    = "payroll@example.com"
//! sender_password = "app-password"
//!
//! [database]
//! url = "sqlite:users.db"
//! ```

use crate::error::DispatchError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level process settings, loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub email: SmtpSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
}

/// SMTP endpoint and sender credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
}

/// User directory database location.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_smtp_port() -> u16 {
    // Implicit-TLS submission port; the transport wraps the whole session.
    465
}

fn default_database_url() -> String {
    "sqlite:users.db".to_string()
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::InvalidConfig(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let settings: Settings = toml::from_str(&raw).map_err(|e| {
            DispatchError::InvalidConfig(format!("cannot parse '{}': {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), DispatchError> {
        if self.email.smtp_server.is_empty() {
            return Err(DispatchError::InvalidConfig("smtp_server is empty".into()));
        }
        if self.email.sender_email.is_empty() {
            return Err(DispatchError::InvalidConfig("sender_email is empty".into()));
        }
        Ok(())
    }
}

// ── Retry policy ─────────────────────────────────────────────────────────

/// Bounded-retry policy for mail delivery.
///
/// Attempts are strictly sequential; the pipeline waits `backoff.delay(n)`
/// between attempt `n` and attempt `n + 1` and never runs two attempts
/// concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Default: 3.
    pub max_attempts: u32,
    /// Wait strategy between attempts. Default: fixed 5 s.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_secs(5)),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay to wait after the given failed attempt (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Wait strategy between delivery attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// Delay doubles after each failed attempt: base, 2×base, 4×base, …
    Exponential { base: Duration },
}

impl Backoff {
    fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt))
            }
        }
    }
}
