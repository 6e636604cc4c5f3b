use std::env;

use anyhow::Context;
use chrono::FixedOffset;

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub db_max_connections: u32,
    /// Defines the clinic's calendar day and how zone-less booking times
    /// are read.
    pub clinic_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(5);
        let offset_minutes = match env::var("CLINIC_UTC_OFFSET_MINUTES") {
            Ok(s) => s
                .trim()
                .parse::<i32>()
                .context("CLINIC_UTC_OFFSET_MINUTES must be an integer")?,
            Err(_) => 0,
        };

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            db_max_connections,
            clinic_offset: clinic_offset(offset_minutes)?,
        })
    }
}

pub fn clinic_offset(minutes: i32) -> anyhow::Result<FixedOffset> {
    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        anyhow::bail!("CLINIC_UTC_OFFSET_MINUTES out of range: {minutes}");
    }
    FixedOffset::east_opt(minutes * 60)
        .with_context(|| format!("invalid clinic offset: {minutes} minutes"))
}
