use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::reading::DEFAULT_READING_SPEED;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";
const MAX_READING_SPEED: u32 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    /// Units (CJK characters or words) read per minute.
    pub reading_speed: u32,
    pub upload_dir: PathBuf,
    pub public_upload_prefix: String,
    /// Directory holding the analytics log as `blog_analytics.json`. When unset
    /// analytics live in memory and are lost on restart.
    pub analytics_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let mut config = Config::for_database(database_url);

        if let Ok(address) = std::env::var("BIND_ADDRESS") {
            config.bind_address = address
                .parse()
                .with_context(|| format!("BIND_ADDRESS {address:?} is not a socket address"))?;
        }
        if let Ok(speed) = std::env::var("READING_SPEED") {
            config.reading_speed = parse_reading_speed(&speed)?;
        }
        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("PUBLIC_UPLOAD_PREFIX") {
            config.public_upload_prefix = prefix.trim_end_matches('/').to_string();
        }
        config.analytics_dir = std::env::var("ANALYTICS_DIR").ok().map(PathBuf::from);
        Ok(config)
    }

    pub fn for_database(database_url: impl Into<String>) -> Self {
        Config {
            database_url: database_url.into(),
            bind_address: DEFAULT_BIND_ADDRESS
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3001))),
            reading_speed: DEFAULT_READING_SPEED,
            upload_dir: PathBuf::from("./uploads"),
            public_upload_prefix: String::from("/uploads"),
            analytics_dir: None,
        }
    }
}

/// Units per minute, between 1 and `MAX_READING_SPEED`.
fn parse_reading_speed(raw: &str) -> Result<u32> {
    let speed: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("READING_SPEED {raw:?} is not a number"))?;
    if speed == 0 || speed > MAX_READING_SPEED {
        bail!("READING_SPEED must be between 1 and {MAX_READING_SPEED}, got {speed}");
    }
    Ok(speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::for_database("sqlite://blog.db");
        assert_eq!(config.database_url, "sqlite://blog.db");
        assert_eq!(config.bind_address, SocketAddr::from(([127, 0, 0, 1], 3001)));
        assert_eq!(config.reading_speed, 200);
        assert_eq!(config.public_upload_prefix, "/uploads");
        assert!(config.analytics_dir.is_none());
    }

    #[test]
    fn reading_speed_is_bounded() {
        assert_eq!(parse_reading_speed(" 250 ").unwrap(), 250);
        assert_eq!(parse_reading_speed("10000").unwrap(), 10_000);
        assert!(parse_reading_speed("0").is_err());
        assert!(parse_reading_speed("10001").is_err());
        assert!(parse_reading_speed("4294967295").is_err());
        assert!(parse_reading_speed("fast").is_err());
    }
}
