use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE};
use reqwest::Client;
use tracing::{Span, field};

use crate::{
    config::RelayConfig, error::RelayError, model::PostalCode, propagation::inject_trace_context,
};

/// The back service's answer, kept byte-for-byte.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Front-service client for the back service's `/clima` endpoint.
#[derive(Debug, Clone)]
pub struct RelayClient {
    climate_service_url: String,
    internal_api_key: String,
    http: Client,
}

impl RelayClient {
    pub fn new(climate_service_url: String, internal_api_key: String) -> Self {
        Self {
            climate_service_url,
            internal_api_key,
            http: Client::new(),
        }
    }

    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        let key = config.internal_api_key()?;
        Ok(Self::new(config.climate_service_url.clone(), key.to_owned()))
    }

    fn clima_url(&self) -> String {
        format!("{}/clima", self.climate_service_url.trim_end_matches('/'))
    }

    /// Forwards one postal code to the back service, carrying the current
    /// trace context. The span ends once the response body has been read or
    /// the request failed.
    #[tracing::instrument(
        name = "forward_to_climate_service",
        skip_all,
        fields(postal_code = %postal_code, http.status_code = field::Empty)
    )]
    pub async fn forward(&self, postal_code: &PostalCode) -> Result<RelayedResponse, RelayError> {
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);

        let res = self
            .http
            .get(self.clima_url())
            .query(&[
                ("cep", postal_code.as_str()),
                ("apiKey", self.internal_api_key.as_str()),
            ])
            .headers(headers)
            .send()
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "climate service request failed");
                RelayError::Unavailable(err)
            })?;

        let status = res.status();
        Span::current().record("http.status_code", status.as_u16());
        let content_type = res.headers().get(CONTENT_TYPE).cloned();

        let body = res.bytes().await.map_err(|err| {
            tracing::error!(error = ?err, "climate service response could not be read");
            RelayError::UnreadableResponse(err)
        })?;

        Ok(RelayedResponse {
            status,
            content_type,
            body,
        })
    }
}
