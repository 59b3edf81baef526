// Telemetry sample domain models
use serde::{Deserialize, Serialize};

/// One reading of the five tracked metrics, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Watts
    pub power: f64,
    /// Percent, 0-100
    pub performance: f64,
    /// W/m²
    pub irradiation: f64,
    /// °C
    pub temperature: f64,
    /// Percent, 0-100
    pub humidity: f64,
}

impl Reading {
    pub fn new(
        power: f64,
        performance: f64,
        irradiation: f64,
        temperature: f64,
        humidity: f64,
    ) -> Self {
        Self {
            power,
            performance,
            irradiation,
            temperature,
            humidity,
        }
    }
}

/// A reading stamped with the relay's receive time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub reading: Reading,
    pub captured_at: String,
}

impl Sample {
    pub fn new(reading: Reading, captured_at: String) -> Self {
        Self {
            reading,
            captured_at,
        }
    }
}
