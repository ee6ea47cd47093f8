use anyhow::{Context, Result};
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    /// Shared secret kiosks send in `X-API-Key`.
    pub device_api_key: String,

    // Prayer schedule provider
    pub schedule_api_base: String,
    pub schedule_timeout: Duration,
    pub schedule_ttl: Duration,

    pub lookup_ttl: Duration,
    pub tz_offset_hours: i32,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_checkin_per_min: u32,

    pub api_prefix: String,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            device_api_key: required("DEVICE_API_KEY")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 259_200)?, // 72h

            schedule_api_base: env::var("SCHEDULE_API_BASE")
                .unwrap_or_else(|_| "https://api.myquran.com/v2".to_string()),
            schedule_timeout: Duration::from_secs(or_default("SCHEDULE_TIMEOUT_SECS", 10)?),
            schedule_ttl: Duration::from_secs(or_default("SCHEDULE_TTL_SECS", 21_600)?), // 6h

            lookup_ttl: Duration::from_secs(or_default("LOOKUP_TTL_SECS", 1_800)?),
            tz_offset_hours: or_default("TZ_OFFSET_HOURS", 7)?,

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: or_default("RATE_REGISTER_PER_MIN", 30)?,
            rate_checkin_per_min: or_default("RATE_CHECKIN_PER_MIN", 600)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_level: or_default("LOG_LEVEL", tracing::Level::INFO)?,
        })
    }

    /// Fixed offset of the home timezone used for local dates and prayer times.
    pub fn home_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.tz_offset_hours * 3600)
            .with_context(|| format!("TZ_OFFSET_HOURS out of range: {}", self.tz_offset_hours))
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/test".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 3600,
            device_api_key: "kiosk-key".to_string(),
            schedule_api_base: "http://localhost".to_string(),
            schedule_timeout: Duration::from_secs(1),
            schedule_ttl: Duration::from_secs(21_600),
            lookup_ttl: Duration::from_secs(1_800),
            tz_offset_hours: 7,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_checkin_per_min: 600,
            api_prefix: "/api".to_string(),
            log_level: tracing::Level::DEBUG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_offset_is_seven_hours_east() {
        let config = Config::for_tests();
        assert_eq!(config.home_offset().unwrap().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let mut config = Config::for_tests();
        config.tz_offset_hours = 30;
        assert!(config.home_offset().is_err());
    }
}
