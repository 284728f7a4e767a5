// src/config.rs
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Timer settings a session runs with.
#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    /// Ceiling of the results race before the mock result wins.
    pub results_timeout: Duration,
    /// Cadence of the fake analysis progress.
    pub progress_tick: Duration,
    /// Cadence of the simulated upload progress after a failed upload.
    pub upload_sim_tick: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            results_timeout: Duration::from_millis(10_000),
            progress_tick: Duration::from_millis(500),
            upload_sim_tick: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub bind_addr: String,
    pub debug: bool,
    pub timings: SessionTimings,
    pub flow_ttl: Duration,
    pub max_photo_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SessionTimings::default();

        let timings = SessionTimings {
            results_timeout: millis(&lookup, "AUTOCHECK_RESULTS_TIMEOUT_MS")?
                .unwrap_or(defaults.results_timeout),
            progress_tick: millis(&lookup, "AUTOCHECK_PROGRESS_TICK_MS")?
                .unwrap_or(defaults.progress_tick),
            upload_sim_tick: millis(&lookup, "AUTOCHECK_UPLOAD_SIM_TICK_MS")?
                .unwrap_or(defaults.upload_sim_tick),
        };

        let debug = lookup("AUTOCHECK_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            api_url: lookup("AUTOCHECK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            bind_addr: lookup("AUTOCHECK_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            debug,
            timings,
            flow_ttl: parsed::<u64, _>(&lookup, "AUTOCHECK_FLOW_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(86400)),
            max_photo_bytes: parsed(&lookup, "AUTOCHECK_MAX_PHOTO_BYTES")?
                .unwrap_or(DEFAULT_MAX_PHOTO_BYTES),
        })
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: {:?}", key, raw))
        })
        .transpose()
}

fn millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed::<u64, _>(lookup, key)? {
        Some(0) => Err(anyhow::anyhow!("{} must be greater than zero", key)),
        value => Ok(value.map(Duration::from_millis)),
    }
}
