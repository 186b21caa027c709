//! HTTP fetcher for the forecast provider.
//!
//! Requests go to `{base_url}/forecast/{api_key}/{lat},{lon}` with the
//! hourly, minutely, daily and alert blocks excluded and SI units. The API
//! key is part of the path, so every URL that reaches a log line or an error
//! message is redacted first.

use serde_json::Value;
use tracing::{debug, warn};
use weatherlog_core::config::ProviderConfig;
use weatherlog_core::fetch::{FetchError, Fetcher};
use weatherlog_types::NewReading;

/// Blocks of the forecast response we never read.
const EXCLUDE: &str = "hourly,minutely,daily,alerts";

/// Errors building a [`ProviderFetcher`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// The provider settings are unusable.
    #[error("invalid provider config: {0}")]
    Config(String),
}

/// [`Fetcher`] backed by the forecast HTTP API.
pub struct ProviderFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    lang: String,
    location: String,
}

impl std::fmt::Debug for ProviderFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFetcher")
            .field("url", &self.redacted_url())
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl ProviderFetcher {
    /// Create a fetcher for `config`, labelling readings with `location`.
    ///
    /// The client's total request timeout is `config.timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the base URL is blank and
    /// [`ProviderError::Client`] if the TLS backend cannot be initialized.
    pub fn new(config: &ProviderConfig, location: impl Into<String>) -> Result<Self, ProviderError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(ProviderError::Config("base_url is empty".to_owned()));
        }
        if config.api_key.is_empty() {
            warn!("Provider API key is empty; requests will likely be rejected");
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
            lang: config.lang.clone(),
            location: location.into(),
        })
    }

    /// Label attached to every reading this fetcher produces.
    pub fn location(&self) -> &str {
        &self.location
    }

    fn forecast_url(&self) -> String {
        format!(
            "{}/forecast/{}/{},{}",
            self.base_url, self.api_key, self.latitude, self.longitude
        )
    }

    /// The request URL with the API key masked, safe to log.
    pub fn redacted_url(&self) -> String {
        format!(
            "{}/forecast/***/{},{}",
            self.base_url, self.latitude, self.longitude
        )
    }
}

impl Fetcher for ProviderFetcher {
    async fn fetch(&self) -> Result<NewReading, FetchError> {
        debug!(url = %self.redacted_url(), "Requesting current conditions");

        let response = self
            .client
            .get(self.forecast_url())
            .query(&[
                ("exclude", EXCLUDE),
                ("units", "si"),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                url = %self.redacted_url(),
                "Provider returned error status"
            );
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport_error)?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| FetchError::malformed(format!("body is not JSON: {e}")))?;

        extract_reading(&json, &self.location)
    }
}

/// Map a `reqwest` failure to [`FetchError::Unreachable`] without the URL,
/// which carries the API key.
fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::unreachable(format!("request timed out: {}", err.without_url()))
    } else {
        FetchError::unreachable(err.without_url())
    }
}

/// Read the current conditions out of a forecast response body.
///
/// Requires `currently.time` (integer seconds), `currently.temperature`
/// (number), `currently.summary` and `currently.icon` (strings).
///
/// # Errors
///
/// Returns [`FetchError::Malformed`] naming the first missing or mistyped
/// field.
pub fn extract_reading(json: &Value, location: &str) -> Result<NewReading, FetchError> {
    let current = json
        .get("currently")
        .filter(|c| c.is_object())
        .ok_or_else(|| FetchError::malformed("response missing `currently` object"))?;

    let observed_at = current
        .get("time")
        .and_then(Value::as_i64)
        .ok_or_else(|| FetchError::malformed("missing or non-integer currently.time"))?;
    let temperature = current
        .get("temperature")
        .and_then(Value::as_f64)
        .ok_or_else(|| FetchError::malformed("missing or non-numeric currently.temperature"))?;
    let description = string_field(current, "summary")?;
    let icon = string_field(current, "icon")?;

    Ok(NewReading {
        observed_at,
        location: location.to_owned(),
        temperature,
        description,
        icon,
    })
}

fn string_field(current: &Value, field: &str) -> Result<String, FetchError> {
    current
        .get(field)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| FetchError::malformed(format!("missing or non-string currently.{field}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ProviderConfig {
        ProviderConfig {
            base_url: "https://api.example.test/".to_owned(),
            api_key: "s3cret".to_owned(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn extract_reading_valid() {
        let json = serde_json::json!({
            "latitude": 49.8209,
            "currently": {
                "time": 1_700_000_000,
                "summary": "Clear",
                "icon": "clear-day",
                "temperature": 21.5,
                "humidity": 0.4
            }
        });
        let reading = extract_reading(&json, "Ostrava").unwrap();
        assert_eq!(reading.observed_at, 1_700_000_000);
        assert!((reading.temperature - 21.5).abs() < f64::EPSILON);
        assert_eq!(reading.description, "Clear");
        assert_eq!(reading.icon, "clear-day");
        assert_eq!(reading.location, "Ostrava");
    }

    #[test]
    fn extract_reading_accepts_integer_temperature() {
        let json = serde_json::json!({
            "currently": {"time": 1, "summary": "Snow", "icon": "snow", "temperature": -3}
        });
        let reading = extract_reading(&json, "Ostrava").unwrap();
        assert!((reading.temperature + 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extract_reading_missing_currently() {
        let json = serde_json::json!({"code": 400, "error": "poorly formatted request"});
        let err = extract_reading(&json, "Ostrava").unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
        assert!(err.to_string().contains("currently"));
    }

    #[test]
    fn extract_reading_missing_icon() {
        let json = serde_json::json!({
            "currently": {"time": 1, "summary": "Clear", "temperature": 2.0}
        });
        let err = extract_reading(&json, "Ostrava").unwrap_err();
        assert!(err.to_string().contains("currently.icon"));
    }

    #[test]
    fn extract_reading_rejects_string_time() {
        let json = serde_json::json!({
            "currently": {"time": "now", "summary": "Clear", "icon": "clear-day", "temperature": 2.0}
        });
        let err = extract_reading(&json, "Ostrava").unwrap_err();
        assert!(err.to_string().contains("currently.time"));
    }

    #[test]
    fn urls_trim_trailing_slash_and_redact_key() {
        let fetcher = ProviderFetcher::new(&config(), "Ostrava").unwrap();
        assert_eq!(
            fetcher.forecast_url(),
            "https://api.example.test/forecast/s3cret/49.8209,18.2625"
        );
        let redacted = fetcher.redacted_url();
        assert!(!redacted.contains("s3cret"));
        assert_eq!(redacted, "https://api.example.test/forecast/***/49.8209,18.2625");
        assert!(!format!("{fetcher:?}").contains("s3cret"));
    }

    #[test]
    fn blank_base_url_is_rejected() {
        let mut cfg = config();
        cfg.base_url = " ".to_owned();
        assert!(matches!(
            ProviderFetcher::new(&cfg, "Ostrava"),
            Err(ProviderError::Config(_))
        ));
    }
}
