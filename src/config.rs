use std::path::PathBuf;
use std::time::Duration;

use crate::registry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub facebook_ads_library_url: String,
    pub google_ads_transparency_url: String,
    pub receitaws_base_url: String,
    /// Budget for one ad-channel check (fetch + interpretation).
    pub ad_check_timeout: Duration,
    /// Timeout of a single ad library page request.
    pub ad_fetch_timeout: Duration,
    /// Budget for one registry lookup, retries included.
    pub registry_timeout: Duration,
    /// Timeout of a single registry request.
    pub registry_request_timeout: Duration,
    pub registry_retry: RetryPolicy,
    pub registry_cache_ttl: Duration,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub criteria_points_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5001,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            facebook_ads_library_url: "https://www.facebook.com/ads/library/".to_string(),
            google_ads_transparency_url: "https://adstransparency.google.com/".to_string(),
            receitaws_base_url: "https://www.receitaws.com.br/v1".to_string(),
            ad_check_timeout: Duration::from_secs(120),
            ad_fetch_timeout: Duration::from_secs(60),
            registry_timeout: Duration::from_secs(300),
            registry_request_timeout: Duration::from_secs(20),
            registry_retry: RetryPolicy::default(),
            registry_cache_ttl: Duration::from_secs(3600),
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
            criteria_points_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            openai_base_url: url_var("OPENAI_BASE_URL", defaults.openai_base_url)?,
            openai_model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.openai_model),
            facebook_ads_library_url: url_var(
                "FACEBOOK_ADS_LIBRARY_URL",
                defaults.facebook_ads_library_url,
            )?,
            google_ads_transparency_url: url_var(
                "GOOGLE_ADS_TRANSPARENCY_URL",
                defaults.google_ads_transparency_url,
            )?,
            receitaws_base_url: url_var("RECEITAWS_BASE_URL", defaults.receitaws_base_url)?,
            ad_check_timeout: secs_var("AD_CHECK_TIMEOUT_SECS", defaults.ad_check_timeout)?,
            ad_fetch_timeout: secs_var("AD_FETCH_TIMEOUT_SECS", defaults.ad_fetch_timeout)?,
            registry_timeout: secs_var("REGISTRY_TIMEOUT_SECS", defaults.registry_timeout)?,
            registry_request_timeout: secs_var(
                "REGISTRY_REQUEST_TIMEOUT_SECS",
                defaults.registry_request_timeout,
            )?,
            registry_retry: RetryPolicy {
                max_attempts: positive_var(
                    "REGISTRY_MAX_ATTEMPTS",
                    defaults.registry_retry.max_attempts,
                )?,
                base_delay: secs_var(
                    "REGISTRY_RETRY_BASE_DELAY_SECS",
                    defaults.registry_retry.base_delay,
                )?,
                multiplier: positive_var(
                    "REGISTRY_RETRY_MULTIPLIER",
                    defaults.registry_retry.multiplier,
                )?,
            },
            registry_cache_ttl: secs_var("REGISTRY_CACHE_TTL_SECS", defaults.registry_cache_ttl)?,
            rate_limit_per_second: positive_var(
                "RATE_LIMIT_PER_SECOND",
                defaults.rate_limit_per_second,
            )?,
            rate_limit_burst: positive_var("RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            criteria_points_file: std::env::var("CRITERIA_POINTS_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        if config.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set. Ad checks will report an error status.");
        }
        tracing::debug!("ReceitaWS Base URL: {}", config.receitaws_base_url);
        tracing::debug!(
            "Timeouts: ad check {:?}, registry {:?}",
            config.ad_check_timeout,
            config.registry_timeout
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn url_var(name: &str, default: String) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(url) if !url.trim().is_empty() => {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
            Ok(url.trim().to_string())
        }
        _ => Ok(default),
    }
}

fn positive_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value: T = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a number", name))?;
            if value <= T::default() {
                anyhow::bail!("{} must be greater than zero", name);
            }
            Ok(value)
        }
        _ => Ok(default),
    }
}

fn secs_var(name: &str, default: Duration) -> anyhow::Result<Duration> {
    positive_var(name, default.as_secs()).map(Duration::from_secs)
}
