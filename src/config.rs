use std::env;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub dispatch_queue_size: usize,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dispatch_queue_size: parse_or_default("DISPATCH_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
        })
    }
}

/// Dispatch policy, mutable at runtime via `PUT /settings/assignment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSettings {
    pub enabled: bool,
    pub max_distance_km: f64,
    pub max_wait_time_secs: u64,
    pub prioritize_rating: bool,
    pub prioritize_proximity: bool,
    pub allow_batching: bool,
    pub batch_window_secs: u64,
    pub max_assignment_attempts: u32,
    pub distance_bucket_km: f64,
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_distance_km: 10.0,
            max_wait_time_secs: 30,
            prioritize_rating: false,
            prioritize_proximity: true,
            allow_batching: false,
            batch_window_secs: 300,
            max_assignment_attempts: 3,
            distance_bucket_km: 0.5,
        }
    }
}

impl AssignmentSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_distance_km <= 0.0 {
            return Err(AppError::BadRequest("max_distance_km must be > 0".to_string()));
        }
        if self.max_wait_time_secs == 0 {
            return Err(AppError::BadRequest("max_wait_time_secs must be > 0".to_string()));
        }
        if self.max_assignment_attempts == 0 {
            return Err(AppError::BadRequest(
                "max_assignment_attempts must be >= 1".to_string(),
            ));
        }
        if self.distance_bucket_km <= 0.0 {
            return Err(AppError::BadRequest("distance_bucket_km must be > 0".to_string()));
        }
        Ok(())
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
