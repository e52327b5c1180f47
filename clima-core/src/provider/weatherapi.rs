use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::UpstreamError,
    model::WeatherReading,
    provider::{Stage, truncate_body},
};

use super::WeatherProvider;

/// Current conditions from WeatherAPI.com, keyed by locality name.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(base_url: String) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: String, http: Client) -> Self {
        Self { base_url, http }
    }
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch_weather(
        &self,
        locality: &str,
        api_key: &str,
    ) -> Result<WeatherReading, UpstreamError> {
        let unavailable = |source| UpstreamError::Unavailable {
            stage: Stage::WeatherService,
            source,
        };

        // `query` encodes both values, so localities with spaces or accents
        // reach the upstream intact.
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("key", api_key), ("q", locality)])
            .send()
            .await
            .map_err(unavailable)?;

        let status = res.status();
        if !status.is_success() {
            tracing::debug!(%status, locality, "weather service answered without success, parsing anyway");
        }

        let body = res.text().await.map_err(unavailable)?;

        let parsed: WaResponse =
            serde_json::from_str(&body).map_err(|err| UpstreamError::Protocol {
                stage: Stage::WeatherService,
                detail: format!("{err}; body: {}", truncate_body(&body)),
            })?;

        Ok(WeatherReading {
            temperature_celsius: parsed.current.temp_c,
        })
    }
}
