use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{error::ClimaError, units};

/// Number of digits in a Brazilian postal code (CEP).
pub const POSTAL_CODE_LEN: usize = 8;

/// Returns true only for exactly eight ASCII decimal digits.
pub fn validate(input: &str) -> bool {
    input.len() == POSTAL_CODE_LEN && input.bytes().all(|b| b.is_ascii_digit())
}

/// A validated 8-digit postal code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(input: &str) -> Result<Self, ClimaError> {
        if validate(input) {
            Ok(Self(input.to_owned()))
        } else {
            Err(ClimaError::InvalidInput)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the locality resolver said about a postal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityResolution {
    pub locality: String,
    pub region: String,
    pub found: bool,
}

impl LocalityResolution {
    pub fn found(locality: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            locality: locality.into(),
            region: region.into(),
            found: true,
        }
    }

    pub fn not_found() -> Self {
        Self {
            locality: String::new(),
            region: String::new(),
            found: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    pub temperature_celsius: f64,
}

/// Final artifact of the pipeline. Fahrenheit and Kelvin are always derived
/// from the Celsius reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateReport {
    pub locality: String,
    pub temperature_celsius: f64,
    pub temperature_fahrenheit: f64,
    pub temperature_kelvin: f64,
}

impl ClimateReport {
    pub fn from_celsius(locality: impl Into<String>, celsius: f64) -> Self {
        Self {
            locality: locality.into(),
            temperature_celsius: celsius,
            temperature_fahrenheit: units::to_fahrenheit(celsius),
            temperature_kelvin: units::to_kelvin(celsius),
        }
    }
}

/// How a report is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportShape {
    /// `{"tempC", "tempF", "tempK"}`, served by the monolithic service.
    Compact,
    /// `{"city", "temp_C", "temp_F", "temp_K"}`, served by the back service.
    WithCity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompactReportBody {
    #[serde(rename = "tempC")]
    pub temp_c: f64,
    #[serde(rename = "tempF")]
    pub temp_f: f64,
    #[serde(rename = "tempK")]
    pub temp_k: f64,
}

impl From<&ClimateReport> for CompactReportBody {
    fn from(report: &ClimateReport) -> Self {
        Self {
            temp_c: report.temperature_celsius,
            temp_f: report.temperature_fahrenheit,
            temp_k: report.temperature_kelvin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CityReportBody {
    pub city: String,
    #[serde(rename = "temp_C")]
    pub temp_c: f64,
    #[serde(rename = "temp_F")]
    pub temp_f: f64,
    #[serde(rename = "temp_K")]
    pub temp_k: f64,
}

impl From<&ClimateReport> for CityReportBody {
    fn from(report: &ClimateReport) -> Self {
        Self {
            city: report.locality.clone(),
            temp_c: report.temperature_celsius,
            temp_f: report.temperature_fahrenheit,
            temp_k: report.temperature_kelvin,
        }
    }
}

/// Body of every non-2xx response produced by the services themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
}
