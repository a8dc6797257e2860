use std::env;

use crate::error::AppError;
use crate::models::rules::CodRules;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub cod_max_amount_new_user: u64,
    pub cod_max_amount_verified_user: u64,
    pub cod_max_distance_km: f64,
    pub cod_min_trust_score: u8,
    pub cod_max_recent_cancellations: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            cod_max_amount_new_user: parse_or_default("COD_MAX_AMOUNT_NEW_USER", 50_000)?,
            cod_max_amount_verified_user: parse_or_default("COD_MAX_AMOUNT_VERIFIED_USER", 100_000)?,
            cod_max_distance_km: parse_or_default("COD_MAX_DISTANCE_KM", 15.0)?,
            cod_min_trust_score: parse_or_default("COD_MIN_TRUST_SCORE", 20)?,
            cod_max_recent_cancellations: parse_or_default("COD_MAX_RECENT_CANCELLATIONS", 2)?,
        })
    }

    /// Startup snapshot of the COD rules; the live copy in `AppState` can be
    /// replaced at runtime through the admin rules endpoint.
    pub fn default_rules(&self) -> CodRules {
        CodRules {
            max_amount_new_user: self.cod_max_amount_new_user,
            max_amount_verified_user: self.cod_max_amount_verified_user,
            max_distance_km: self.cod_max_distance_km,
            min_trust_score: self.cod_min_trust_score,
            max_recent_cancellations: self.cod_max_recent_cancellations,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
