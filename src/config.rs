//! Process configuration, read from the environment.
//!
//! `.env` is only loaded by `main` in debug builds; production deployments
//! are expected to set variables explicitly.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::auth::MIN_SECRET_LEN;
use crate::rate_limit::RateLimitConfig;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argon2Config {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    // OWASP minimum recommendation for argon2id
    fn default() -> Self {
        Self { memory_kib: 19_456, iterations: 2, parallelism: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub product_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub otp_ttl: Duration,
    /// Interval of the expired-code sweep; `None` disables it.
    pub otp_sweep_every: Option<StdDuration>,
    pub argon2: Argon2Config,
    pub smtp: Option<SmtpConfig>,
    pub data_dir: Option<PathBuf>,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
    pub rate_limit: RateLimitConfig,
    pub rate_limit_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let otp_ttl_secs: i64 = parse_or(&var, "OTP_TTL_SECS", 300)?;
        if otp_ttl_secs <= 0 {
            return Err(ConfigError::Invalid { var: "OTP_TTL_SECS", reason: "must be positive".into() });
        }
        let token_ttl_secs: i64 = parse_or(&var, "TOKEN_TTL_SECS", 86_400)?;
        if token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid { var: "TOKEN_TTL_SECS", reason: "must be positive".into() });
        }
        let sweep_secs: u64 = parse_or(&var, "OTP_SWEEP_SECS", 60)?;

        let defaults = Argon2Config::default();
        let argon2 = Argon2Config {
            memory_kib: parse_or(&var, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&var, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&var, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let smtp = match var("SMTP_HOST") {
            None => None,
            Some(host) => Some(SmtpConfig {
                host,
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                from: var("SMTP_FROM").ok_or(ConfigError::Missing("SMTP_FROM"))?,
                product_name: var("PRODUCT_NAME").unwrap_or_else(|| "DeFi".to_string()),
            }),
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 8080)?,
            jwt_secret,
            token_ttl: Duration::seconds(token_ttl_secs),
            otp_ttl: Duration::seconds(otp_ttl_secs),
            otp_sweep_every: (sweep_secs > 0).then(|| StdDuration::from_secs(sweep_secs)),
            argon2,
            smtp,
            data_dir: var("DATA_DIR").map(PathBuf::from),
            frontend_url: var("FRONTEND_URL"),
            enable_hsts: parse_bool(&var, "ENABLE_HSTS", false)?,
            rate_limit: RateLimitConfig::from_lookup(&var),
            rate_limit_enabled: parse_bool(&var, "RL_ENABLED", true)?,
        })
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid { var: name, reason: e.to_string() }),
    }
}

fn parse_bool<F>(var: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "1" || v == "true" || v == "yes" => Ok(true),
        Some(v) if v == "0" || v == "false" || v == "no" => Ok(false),
        Some(v) => Err(ConfigError::Invalid { var: name, reason: format!("'{v}' is not a boolean") }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.otp_ttl, Duration::minutes(5));
        assert_eq!(cfg.token_ttl, Duration::hours(24));
        assert_eq!(cfg.otp_sweep_every, Some(StdDuration::from_secs(60)));
        assert_eq!(cfg.argon2, Argon2Config::default());
        assert!(cfg.smtp.is_none());
        assert!(cfg.rate_limit_enabled);
        assert!(!cfg.enable_hsts);
    }

    #[test]
    fn secret_required_and_long_enough() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("JWT_SECRET", "short")])),
            Err(ConfigError::Invalid { var: "JWT_SECRET", .. })
        ));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("OTP_TTL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "OTP_TTL_SECS", .. }));
    }

    #[test]
    fn smtp_needs_from_address() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("SMTP_HOST", "smtp.example.com")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("SMTP_FROM"));
        let cfg = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM", "DeFi <no-reply@example.com>"),
        ]))
        .unwrap();
        assert_eq!(cfg.smtp.unwrap().host, "smtp.example.com");
    }

    #[test]
    fn sweep_can_be_disabled() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("OTP_SWEEP_SECS", "0"), ("RL_ENABLED", "false")]))
            .unwrap();
        assert!(cfg.otp_sweep_every.is_none());
        assert!(!cfg.rate_limit_enabled);
    }
}
