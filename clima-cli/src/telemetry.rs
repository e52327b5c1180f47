use anyhow::{Context, Result};
use clima_core::TelemetryConfig;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the tracer provider alive; call [`TelemetryGuard::shutdown`] before
/// exiting so batched spans are exported.
#[must_use = "call .shutdown() at the end of the program, otherwise spans may get lost"]
pub struct TelemetryGuard {
    tracer_provider: TracerProvider,
}

impl TelemetryGuard {
    /// Call this at the end of the program.
    pub async fn shutdown(self) {
        let task = tokio::task::spawn_blocking(move || self.blocking_shutdown());
        if let Err(err) = task.await {
            eprintln!("telemetry shutdown task failed: {err}");
        }
    }

    fn blocking_shutdown(self) {
        for result in self.tracer_provider.force_flush() {
            if let Err(err) = result {
                // use stderr because tracing may already be torn down
                eprintln!("failed to flush opentelemetry spans: {err:?}");
            }
        }
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("failed to shut down tracer provider: {err:?}");
        }
    }
}

/// Installs the global subscriber and the W3C trace context propagator.
///
/// The `tracing-opentelemetry` layer is always installed so spans carry an
/// OpenTelemetry context that can be propagated; export over OTLP only
/// happens when `otel_enabled` is set.
pub fn init(service_name: &str, config: &TelemetryConfig) -> Result<TelemetryGuard> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let tracer_provider = tracer_provider(service_name, config)?;
    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(TelemetryGuard { tracer_provider })
}

fn tracer_provider(service_name: &str, config: &TelemetryConfig) -> Result<TracerProvider> {
    let builder = TracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]));

    if !config.otel_enabled {
        return Ok(builder.build());
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otel_endpoint)
        .build()
        .context("Failed to build OTLP span exporter")?;

    Ok(builder.with_batch_exporter(exporter, runtime::Tokio).build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use clima_core::propagation::inject_trace_context;

    #[test]
    fn spans_propagate_without_export() {
        global::set_text_map_propagator(TraceContextPropagator::new());
        let config = TelemetryConfig::default();
        assert!(!config.otel_enabled);

        let provider = tracer_provider("clima-test", &config).unwrap();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("clima-test")));
        let _guard = tracing::subscriber::set_default(subscriber);

        let span = tracing::info_span!("outbound");
        let _entered = span.enter();
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);

        let traceparent = headers
            .get("traceparent")
            .expect("traceparent should be injected with export disabled")
            .to_str()
            .unwrap();
        assert!(traceparent.starts_with("00-"), "{traceparent}");
        assert!(traceparent.ends_with("-01"), "{traceparent}");
    }
}
