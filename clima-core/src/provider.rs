use crate::{
    config::UpstreamConfig,
    error::UpstreamError,
    model::{LocalityResolution, PostalCode, WeatherReading},
    provider::{viacep::ViaCepResolver, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use std::{fmt::Debug, future::Future};
use tracing::{Instrument, Span, field, info_span};

pub mod viacep;
pub mod weatherapi;

/// The upstream a call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    LocalityResolver,
    WeatherService,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::LocalityResolver => "locality-resolver",
            Stage::WeatherService => "weather-service",
        }
    }

    /// Logical operation name recorded on the span of a call to this stage.
    pub fn operation(&self) -> &'static str {
        match self {
            Stage::LocalityResolver => "resolve_locality",
            Stage::WeatherService => "fetch_weather",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait LocalityResolver: Send + Sync + Debug {
    async fn resolve(&self, postal_code: &PostalCode)
    -> Result<LocalityResolution, UpstreamError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_weather(
        &self,
        locality: &str,
        api_key: &str,
    ) -> Result<WeatherReading, UpstreamError>;
}

/// Runs one upstream call inside its own span.
///
/// The span is opened before `call` is first polled and closed once it
/// resolves or is dropped, so every exit path (including cancellation) ends
/// the span. Failures are marked on the span for the exporter.
pub async fn traced<T, F>(stage: Stage, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    let span = info_span!(
        "upstream_call",
        otel.name = stage.operation(),
        upstream = stage.as_str(),
        otel.status_code = field::Empty,
        error = field::Empty,
    );

    async move {
        let result = call.await;
        if let Err(err) = &result {
            let current = Span::current();
            current.record("otel.status_code", "ERROR");
            current.record("error", field::display(err));
        }
        result
    }
    .instrument(span)
    .await
}

/// Construct the locality resolver from config.
pub fn resolver_from_config(config: &UpstreamConfig) -> Box<dyn LocalityResolver> {
    Box::new(ViaCepResolver::new(config.resolver_base_url.clone()))
}

/// Construct the weather provider from config.
pub fn weather_from_config(config: &UpstreamConfig) -> Box<dyn WeatherProvider> {
    Box::new(WeatherApiProvider::new(config.weather_base_url.clone()))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
