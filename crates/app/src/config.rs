//! Environment-driven configuration.

use std::time::Duration;

use thiserror::Error;

use tradeflow_core::Locale;
use tradeflow_search::{ApiConfig, LocaleResolver};

pub const API_URL_VAR: &str = "TRADEFLOW_API_URL";
pub const AUTH_TOKEN_VAR: &str = "TRADEFLOW_AUTH_TOKEN";
pub const LOCALE_VAR: &str = "TRADEFLOW_LOCALE";
pub const CURRENCY_VAR: &str = "TRADEFLOW_CURRENCY";
pub const TIMEOUT_VAR: &str = "TRADEFLOW_REQUEST_TIMEOUT_SECS";
pub const FX_TELEMETRY_URL_VAR: &str = "TRADEFLOW_FX_TELEMETRY_URL";
pub const HEALTH_POLL_VAR: &str = "TRADEFLOW_HEALTH_POLL_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_HEALTH_POLL_SECS: u64 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds { var: &'static str, value: String },

    #[error("{var} is not usable: {reason}")]
    InvalidLocale { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    /// Wins over the detected user locale.
    pub locale_override: Option<Locale>,
    /// Applied on top of whichever locale resolves.
    pub currency_override: Option<String>,
    pub request_timeout: Duration,
    pub fx_telemetry_url: String,
    pub health_poll_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            locale_override: None,
            currency_override: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fx_telemetry_url: telemetry_url_for(DEFAULT_API_URL),
            health_poll_interval: Duration::from_secs(DEFAULT_HEALTH_POLL_SECS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = match get(API_URL_VAR) {
            Some(url) => validate_url(API_URL_VAR, url)?,
            None => DEFAULT_API_URL.to_string(),
        };

        let fx_telemetry_url = match get(FX_TELEMETRY_URL_VAR) {
            Some(url) => validate_url(FX_TELEMETRY_URL_VAR, url)?,
            None => telemetry_url_for(&api_url),
        };

        let locale_override = get(LOCALE_VAR)
            .map(|tag| {
                Locale::from_tag(&tag).map_err(|e| ConfigError::InvalidLocale {
                    var: LOCALE_VAR,
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let currency_override = get(CURRENCY_VAR)
            .map(|c| {
                Locale::default()
                    .with_currency(&c)
                    .map(|l| l.currency)
                    .map_err(|e| ConfigError::InvalidLocale {
                        var: CURRENCY_VAR,
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        let request_timeout = seconds(TIMEOUT_VAR, get(TIMEOUT_VAR), DEFAULT_TIMEOUT_SECS)?;
        let health_poll_interval =
            seconds(HEALTH_POLL_VAR, get(HEALTH_POLL_VAR), DEFAULT_HEALTH_POLL_SECS)?;

        Ok(Self {
            api_url,
            auth_token: get(AUTH_TOKEN_VAR),
            locale_override,
            currency_override,
            request_timeout,
            fx_telemetry_url,
            health_poll_interval,
        })
    }

    /// Point at another search service. A telemetry URL derived from the
    /// old API URL follows it; an explicitly configured one is kept.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let url = validate_url("--api-url", url.trim().to_string())?;
        if self.fx_telemetry_url == telemetry_url_for(&self.api_url) {
            self.fx_telemetry_url = telemetry_url_for(&url);
        }
        self.api_url = url;
        Ok(self)
    }

    /// Locale resolver for `detected`, with this configuration's overrides applied.
    pub fn locale_resolver(&self, detected: Option<Locale>) -> LocaleResolver {
        let resolver = LocaleResolver::new(detected);
        let base = self.locale_override.clone();

        let Some(currency) = &self.currency_override else {
            return match base {
                Some(locale) => resolver.with_override(locale),
                None => resolver,
            };
        };

        let base = base.unwrap_or_else(|| resolver.resolve());
        match base.clone().with_currency(currency) {
            Ok(locale) => resolver.with_override(locale),
            Err(e) => {
                // Currency was validated on load; keep the base locale regardless.
                tracing::error!(error = %e, "currency override rejected");
                resolver.with_override(base)
            }
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            auth_token: self.auth_token.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn telemetry_url_for(api_url: &str) -> String {
    format!("{}/fx/telemetry", api_url.trim_end_matches('/'))
}

fn validate_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => {
            Ok(value.trim_end_matches('/').to_string())
        }
        _ => Err(ConfigError::InvalidUrl { var, value }),
    }
}

fn seconds(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let Some(value) = value else {
        return Ok(Duration::from_secs(default));
    };
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds { var, value }),
    }
}
