//! Core library for the `clima` services.
//!
//! This crate defines:
//! - Postal code validation and the request-scoped domain models
//! - Clients for the locality resolver (ViaCEP) and the weather service (WeatherAPI)
//! - The two-hop orchestration pipeline and its error taxonomy
//! - W3C trace context propagation between the front and back services
//! - The axum routers for the monolithic, back and front services
//!
//! Process bootstrap (listeners, telemetry exporters) lives in `clima-cli`.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod propagation;
pub mod provider;
pub mod relay;
pub mod server;
pub mod units;

pub use config::{Config, RelayConfig, TelemetryConfig, UpstreamConfig};
pub use error::{ClimaError, RelayError, UpstreamError};
pub use model::{ClimateReport, LocalityResolution, PostalCode, ReportShape, WeatherReading};
pub use pipeline::ClimatePipeline;
pub use provider::{LocalityResolver, Stage, WeatherProvider};
pub use relay::RelayClient;
pub use server::{clima_router, relay_router};
