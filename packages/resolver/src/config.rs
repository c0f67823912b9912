//! Runtime configuration read from environment variables.
//!
//! | Variable                | Default                                     |
//! |-------------------------|---------------------------------------------|
//! | `GEOCODER_URL`          | `https://geocoding.geo.census.gov/geocoder` |
//! | `GEOCODER_BENCHMARK`    | `Public_AR_Current`                         |
//! | `HTTP_TIMEOUT_SECS`     | `15`                                        |
//! | `RETRY_MAX`             | `2`                                         |
//! | `RETRY_BASE_DELAY_MS`   | `500`                                       |
//! | `PARCEL_CACHE_CAPACITY` | `10000`                                     |
//!
//! Unparseable values are logged and replaced by the default.

use std::str::FromStr;
use std::time::Duration;

use parcel_lookup_geocoder::census;
use parcel_lookup_http::retry::RetryPolicy;

use crate::cache::DEFAULT_CAPACITY;

/// Default timeout for every outbound request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Settings for building a [`crate::Resolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Census geocoder base URL (no trailing slash).
    pub geocoder_url: String,
    /// Census geocoder benchmark name.
    pub geocoder_benchmark: String,
    /// Per-request timeout for geocoder and feature service calls.
    pub http_timeout: Duration,
    /// Retry policy shared by every outbound call.
    pub retry: RetryPolicy,
    /// Maximum cached outcomes.
    pub cache_capacity: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            geocoder_url: census::DEFAULT_BASE_URL.to_string(),
            geocoder_benchmark: census::DEFAULT_BENCHMARK.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            retry: RetryPolicy::default(),
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl ResolverConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let geocoder_url = lookup("GEOCODER_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.geocoder_url);
        let geocoder_benchmark = lookup("GEOCODER_BENCHMARK")
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(defaults.geocoder_benchmark);

        let timeout_secs = parse_or(&lookup, "HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs());
        let max_retries = parse_or(&lookup, "RETRY_MAX", defaults.retry.max_retries);
        let base_delay_ms = parse_or(
            &lookup,
            "RETRY_BASE_DELAY_MS",
            u64::try_from(defaults.retry.base_delay.as_millis()).unwrap_or(u64::MAX),
        );
        let cache_capacity = parse_or(&lookup, "PARCEL_CACHE_CAPACITY", defaults.cache_capacity);

        Self {
            geocoder_url,
            geocoder_benchmark,
            http_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::new(max_retries, Duration::from_millis(base_delay_ms)),
            cache_capacity,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        log::warn!("Ignoring invalid {key}='{raw}', using {default}");
        default
    })
}
