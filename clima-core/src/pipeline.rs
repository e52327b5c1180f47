//! Two-hop orchestration: validate, resolve the locality, fetch the weather,
//! convert. Each step runs once; the first failure ends the request.

use tracing::{info, warn};

use crate::{
    config::UpstreamConfig,
    error::ClimaError,
    model::{ClimateReport, PostalCode},
    provider::{
        self, LocalityResolver, Stage, WeatherProvider, resolver_from_config, weather_from_config,
    },
};

#[derive(Debug)]
pub struct ClimatePipeline {
    resolver: Box<dyn LocalityResolver>,
    weather: Box<dyn WeatherProvider>,
    default_api_key: Option<String>,
}

impl ClimatePipeline {
    pub fn new(resolver: Box<dyn LocalityResolver>, weather: Box<dyn WeatherProvider>) -> Self {
        Self {
            resolver,
            weather,
            default_api_key: None,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(resolver_from_config(config), weather_from_config(config))
            .with_default_api_key(config.weather_api_key.clone())
    }

    /// Key used when a request arrives without one.
    pub fn with_default_api_key(self, key: Option<String>) -> Self {
        Self {
            default_api_key: key.filter(|k| !k.is_empty()),
            ..self
        }
    }

    pub async fn run(&self, cep: &str, api_key: &str) -> Result<ClimateReport, ClimaError> {
        let postal_code = PostalCode::parse(cep)?;

        let resolution = provider::traced(
            Stage::LocalityResolver,
            self.resolver.resolve(&postal_code),
        )
        .await
        .map_err(|err| {
            warn!(error = ?err, %postal_code, "locality lookup failed");
            ClimaError::ResolverFailure(err)
        })?;

        if !resolution.found {
            info!(%postal_code, "postal code did not resolve to a locality");
            return Err(ClimaError::NotFound);
        }

        let api_key = match (api_key, self.default_api_key.as_deref()) {
            ("", Some(fallback)) => fallback,
            (key, _) => key,
        };

        let reading = provider::traced(
            Stage::WeatherService,
            self.weather.fetch_weather(&resolution.locality, api_key),
        )
        .await
        .map_err(|err| {
            warn!(error = ?err, locality = %resolution.locality, "weather lookup failed");
            ClimaError::WeatherFailure(err)
        })?;

        Ok(ClimateReport::from_celsius(
            resolution.locality,
            reading.temperature_celsius,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::UpstreamError,
        model::{LocalityResolution, WeatherReading},
    };
    use async_trait::async_trait;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug, Clone, Copy)]
    enum ResolverBehavior {
        Found,
        NotFound,
        Broken,
    }

    #[derive(Debug)]
    struct StubResolver {
        behavior: ResolverBehavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LocalityResolver for StubResolver {
        async fn resolve(
            &self,
            _postal_code: &PostalCode,
        ) -> Result<LocalityResolution, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                ResolverBehavior::Found => Ok(LocalityResolution::found("TesteCity", "Teste")),
                ResolverBehavior::NotFound => Ok(LocalityResolution::not_found()),
                ResolverBehavior::Broken => Err(UpstreamError::Protocol {
                    stage: Stage::LocalityResolver,
                    detail: "not json".to_string(),
                }),
            }
        }
    }

    #[derive(Debug)]
    struct StubWeather {
        celsius: Option<f64>,
        calls: Arc<AtomicUsize>,
        seen_keys: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl WeatherProvider for StubWeather {
        async fn fetch_weather(
            &self,
            _locality: &str,
            api_key: &str,
        ) -> Result<WeatherReading, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys.lock().unwrap().push(api_key.to_string());
            match self.celsius {
                Some(temperature_celsius) => Ok(WeatherReading {
                    temperature_celsius,
                }),
                None => Err(UpstreamError::Protocol {
                    stage: Stage::WeatherService,
                    detail: "missing field `current`".to_string(),
                }),
            }
        }
    }

    struct Harness {
        pipeline: ClimatePipeline,
        resolver_calls: Arc<AtomicUsize>,
        weather_calls: Arc<AtomicUsize>,
        seen_keys: Arc<Mutex<Vec<String>>>,
    }

    fn harness(behavior: ResolverBehavior, celsius: Option<f64>) -> Harness {
        let resolver_calls = Arc::new(AtomicUsize::new(0));
        let weather_calls = Arc::new(AtomicUsize::new(0));
        let seen_keys = Arc::new(Mutex::new(Vec::new()));

        let pipeline = ClimatePipeline::new(
            Box::new(StubResolver {
                behavior,
                calls: resolver_calls.clone(),
            }),
            Box::new(StubWeather {
                celsius,
                calls: weather_calls.clone(),
                seen_keys: seen_keys.clone(),
            }),
        );

        Harness {
            pipeline,
            resolver_calls,
            weather_calls,
            seen_keys,
        }
    }

    #[tokio::test]
    async fn success_converts_units() {
        let h = harness(ResolverBehavior::Found, Some(10.0));

        let report = h.pipeline.run("12345678", "fake").await.unwrap();

        assert_eq!(report, ClimateReport::from_celsius("TesteCity", 10.0));
        assert_eq!(report.temperature_fahrenheit, 50.0);
        assert_eq!(report.temperature_kelvin, 283.0);
        assert_eq!(h.resolver_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.weather_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_upstreams() {
        let h = harness(ResolverBehavior::Found, Some(10.0));

        let err = h.pipeline.run("12345", "fake").await.unwrap_err();

        assert!(matches!(err, ClimaError::InvalidInput));
        assert_eq!(h.resolver_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.weather_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unresolved_postal_code_skips_weather() {
        let h = harness(ResolverBehavior::NotFound, Some(10.0));

        let err = h.pipeline.run("00000000", "fake").await.unwrap_err();

        assert!(matches!(err, ClimaError::NotFound));
        assert_eq!(h.resolver_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.weather_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolver_failure_is_not_retried() {
        let h = harness(ResolverBehavior::Broken, Some(10.0));

        let err = h.pipeline.run("12345678", "fake").await.unwrap_err();

        assert!(matches!(err, ClimaError::ResolverFailure(_)));
        assert_eq!(h.resolver_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.weather_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weather_failure_is_not_retried() {
        let h = harness(ResolverBehavior::Found, None);

        let err = h.pipeline.run("12345678", "fake").await.unwrap_err();

        assert!(matches!(err, ClimaError::WeatherFailure(_)));
        assert_eq!(h.resolver_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.weather_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_requests_are_independent() {
        let h = harness(ResolverBehavior::Found, Some(21.5));

        let first = h.pipeline.run("12345678", "fake").await.unwrap();
        let second = h.pipeline.run("12345678", "fake").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.resolver_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.weather_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_key_falls_back_to_configured_key() {
        let h = harness(ResolverBehavior::Found, Some(10.0));
        let pipeline = h.pipeline.with_default_api_key(Some("CONFIGURED".into()));

        pipeline.run("12345678", "").await.unwrap();
        pipeline.run("12345678", "explicit").await.unwrap();

        assert_eq!(*h.seen_keys.lock().unwrap(), ["CONFIGURED", "explicit"]);
    }
}
