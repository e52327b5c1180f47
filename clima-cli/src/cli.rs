use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clima_core::{
    ClimaError, ClimatePipeline, Config, RelayClient, ReportShape, clima_router, relay_router,
};
use std::{net::SocketAddr, path::PathBuf};
use tracing::info;

use crate::telemetry;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "clima", version, about = "Temperature by Brazilian postal code")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "CLIMA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monolithic service (`GET /clima`).
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },

    /// Run the back service (`GET /clima`, answers with the city name).
    Back {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },

    /// Run the front service (`POST /consulta`), relaying to the back service.
    Front {
        #[arg(long, env = "PORT", default_value_t = 8081)]
        port: u16,

        /// Base URL of the back service; overrides the config file.
        #[arg(long, env = "CLIMATE_SERVICE_URL")]
        climate_service_url: Option<String>,
    },

    /// Look up the temperature for one postal code and print it.
    Lookup {
        /// 8-digit postal code, e.g. 01001000.
        cep: String,

        /// Weather API key; defaults to the configured one.
        #[arg(long, env = "WEATHER_API_KEY")]
        api_key: Option<String>,
    },

    /// Interactively edit the configuration file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Serve { port } => {
                let guard = telemetry::init("clima", &config.telemetry)?;
                let app = clima_router(
                    ClimatePipeline::from_config(&config.upstream),
                    ReportShape::Compact,
                );
                let result = serve(app, port).await;
                guard.shutdown().await;
                result
            }
            Command::Back { port } => {
                let guard = telemetry::init("clima-back", &config.telemetry)?;
                let app = clima_router(
                    ClimatePipeline::from_config(&config.upstream),
                    ReportShape::WithCity,
                );
                let result = serve(app, port).await;
                guard.shutdown().await;
                result
            }
            Command::Front {
                port,
                climate_service_url,
            } => {
                let guard = telemetry::init("clima-front", &config.telemetry)?;
                let mut relay_config = config.relay.clone();
                if let Some(url) = climate_service_url {
                    relay_config.climate_service_url = url;
                }
                let app = relay_router(RelayClient::from_config(&relay_config)?);
                let result = serve(app, port).await;
                guard.shutdown().await;
                result
            }
            Command::Lookup { cep, api_key } => {
                let guard = telemetry::init("clima", &config.telemetry)?;
                let result = lookup(&config, &cep, api_key.as_deref()).await;
                guard.shutdown().await;
                result
            }
            Command::Configure => configure(config, self.config.as_deref()),
        }
    }
}

async fn serve(app: axum::Router, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server terminated unexpectedly")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn lookup(config: &Config, cep: &str, api_key: Option<&str>) -> Result<()> {
    let pipeline = ClimatePipeline::from_config(&config.upstream);

    match pipeline.run(cep, api_key.unwrap_or_default()).await {
        Ok(report) => {
            println!("{}", report.locality);
            println!("  {:.1} °C", report.temperature_celsius);
            println!("  {:.1} °F", report.temperature_fahrenheit);
            println!("  {:.1} K", report.temperature_kelvin);
            Ok(())
        }
        Err(err @ (ClimaError::InvalidInput | ClimaError::NotFound)) => {
            Err(anyhow::anyhow!("{err} ({})", err.status()))
        }
        Err(err) => Err(anyhow::Error::new(err).context("Lookup failed")),
    }
}

fn configure(mut config: Config, path: Option<&std::path::Path>) -> Result<()> {
    use inquire::Text;

    config.upstream.weather_api_key = optional(
        Text::new("Weather API key:")
            .with_default(config.upstream.weather_api_key.as_deref().unwrap_or_default())
            .prompt()?,
    );
    config.upstream.resolver_base_url = Text::new("Postal code service base URL:")
        .with_default(&config.upstream.resolver_base_url)
        .prompt()?;
    config.upstream.weather_base_url = Text::new("Weather service URL:")
        .with_default(&config.upstream.weather_base_url)
        .prompt()?;
    config.relay.climate_service_url = Text::new("Back service URL (front service only):")
        .with_default(&config.relay.climate_service_url)
        .prompt()?;
    config.relay.internal_api_key = optional(
        Text::new("Weather API key forwarded by the front service:")
            .with_default(
                config
                    .relay
                    .internal_api_key
                    .as_deref()
                    .or(config.upstream.weather_api_key.as_deref())
                    .unwrap_or_default(),
            )
            .prompt()?,
    );

    let saved_to = match path {
        Some(path) => {
            config.save_to(path)?;
            path.to_path_buf()
        }
        None => config.save()?,
    };
    println!("Configuration saved to {}", saved_to.display());
    Ok(())
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
