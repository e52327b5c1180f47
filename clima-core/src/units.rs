//! Temperature conversions from the Celsius reading.

/// `c * 1.8 + 32`.
pub fn to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

/// `c + 273`. The offset is the integer 273, not 273.15.
pub fn to_kelvin(celsius: f64) -> f64 {
    celsius + 273.0
}
