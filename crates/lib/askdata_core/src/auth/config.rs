//! Session credential settings.

use thiserror::Error;

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;

/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 30;

/// Invalid session settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Secrets, claims, and lifetimes used by the token codec.
///
/// Constructed once at startup and handed to `TokenCodec` / `SessionManager`.
#[derive(Clone)]
pub struct SessionConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    /// Clock-skew tolerance applied to `exp` checks.
    pub leeway_secs: u64,
}

impl SessionConfig {
    /// Build a config with default lifetimes and no leeway.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            access_ttl_minutes: DEFAULT_ACCESS_TTL_MINUTES,
            refresh_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            leeway_secs: 0,
        }
    }

    /// Check the invariants the codec relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_ACCESS_SECRET"));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_REFRESH_SECRET"));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::Invalid {
                name: "JWT_REFRESH_SECRET",
                reason: "must differ from JWT_ACCESS_SECRET".into(),
            });
        }
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("JWT_ISSUER"));
        }
        if self.audience.is_empty() {
            return Err(ConfigError::Missing("JWT_AUDIENCE"));
        }
        if self.access_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_ACCESS_TTL_MIN",
                reason: "must be positive".into(),
            });
        }
        if self.refresh_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "JWT_REFRESH_TTL_DAYS",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_minutes * 60
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_days * 24 * 3600
    }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}
