use std::env;

use chrono::FixedOffset;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_schema: String,
    /// Calendar days (POC intervals, daily log dates) are interpreted in this offset.
    pub reference_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);
        let db_schema = env::var("DB_SCHEMA").unwrap_or_else(|_| "public".to_string());

        let reference_offset = match env::var("POC_REFERENCE_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw)?,
            Err(_) => FixedOffset::east_opt(0).ok_or_else(|| anyhow::anyhow!("invalid UTC offset"))?,
        };

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            db_schema,
            reference_offset,
        })
    }
}

/// Parses `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow::anyhow!("invalid UTC offset"));
    }

    let (sign, rest) = match raw.chars().next() {
        Some('+') => (1, &raw[1..]),
        Some('-') => (-1, &raw[1..]),
        _ => anyhow::bail!("POC_REFERENCE_UTC_OFFSET must look like +HH:MM or -HH:MM, got {raw:?}"),
    };

    let Some((hh, mm)) = rest.split_once(':') else {
        anyhow::bail!("POC_REFERENCE_UTC_OFFSET must look like +HH:MM or -HH:MM, got {raw:?}");
    };
    let hours: i32 = hh.parse()?;
    let minutes: i32 = mm.parse()?;
    if !(0..=14).contains(&hours) || !(0..=59).contains(&minutes) {
        anyhow::bail!("POC_REFERENCE_UTC_OFFSET out of range: {raw:?}");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow::anyhow!("POC_REFERENCE_UTC_OFFSET out of range: {raw:?}"))
}
