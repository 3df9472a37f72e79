//! API server configuration.

pub use askdata_core::auth::config::{ConfigError, SessionConfig};
use askdata_core::auth::config::{DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS};

/// Attributes applied to the auth cookies.
///
/// `HttpOnly`, `SameSite=Lax`, and `Path=/` are always set.
#[derive(Clone, Debug, Default)]
pub struct CookieConfig {
    /// Send the `Secure` attribute.
    pub secure: bool,
    /// Cookie `Domain`; host-only when `None`.
    pub domain: Option<String>,
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Token secrets, claims, and lifetimes.
    pub session: SessionConfig,
    pub cookies: CookieConfig,
    /// Allowed CORS origins; empty means any origin without credentials.
    pub cors_origins: Vec<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable               | Default          |
    /// |------------------------|------------------|
    /// | `BIND_ADDR`            | `0.0.0.0:8000`   |
    /// | `DATABASE_URL`         | required         |
    /// | `JWT_ACCESS_SECRET`    | required         |
    /// | `JWT_REFRESH_SECRET`   | required         |
    /// | `JWT_ISSUER`           | required         |
    /// | `JWT_AUDIENCE`         | required         |
    /// | `JWT_ACCESS_TTL_MIN`   | `15`             |
    /// | `JWT_REFRESH_TTL_DAYS` | `30`             |
    /// | `JWT_LEEWAY_SECS`      | `0`              |
    /// | `COOKIE_SECURE`        | `false`          |
    /// | `COOKIE_DOMAIN`        | unset            |
    /// | `CORS_ORIGINS`         | unset            |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let session = SessionConfig {
            access_secret: require("JWT_ACCESS_SECRET")?,
            refresh_secret: require("JWT_REFRESH_SECRET")?,
            issuer: require("JWT_ISSUER")?,
            audience: require("JWT_AUDIENCE")?,
            access_ttl_minutes: parse_or(
                "JWT_ACCESS_TTL_MIN",
                get("JWT_ACCESS_TTL_MIN"),
                DEFAULT_ACCESS_TTL_MINUTES,
            )?,
            refresh_ttl_days: parse_or(
                "JWT_REFRESH_TTL_DAYS",
                get("JWT_REFRESH_TTL_DAYS"),
                DEFAULT_REFRESH_TTL_DAYS,
            )?,
            leeway_secs: parse_or("JWT_LEEWAY_SECS", get("JWT_LEEWAY_SECS"), 0)?,
        };
        session.validate()?;

        let secure = match get("COOKIE_SECURE") {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                name: "COOKIE_SECURE",
                reason: format!("not a boolean: {raw}"),
            })?,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".into()),
            database_url: require("DATABASE_URL")?,
            session,
            cookies: CookieConfig {
                secure,
                domain: get("COOKIE_DOMAIN"),
            },
            cors_origins: get("CORS_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
