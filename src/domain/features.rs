//! Operating parameters and the fixed-schema feature record
//!
//! The scaler and every regressor were fit on twelve columns in a fixed order.
//! [`FeatureRecord`] is the only way a row is built, so the order in
//! [`FEATURE_NAMES`] and [`FeatureRecord::values`] cannot drift apart.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Column names, in the order the artifacts were fit on.
pub const FEATURE_NAMES: [&str; 12] = [
    "Temperature",
    "Humidity",
    "SquareFootage",
    "Occupancy",
    "HVACUsage",
    "LightingUsage",
    "RenewableEnergy",
    "DayOfWeek",
    "Holiday",
    "Hour",
    "DayOfYear",
    "Energy_Lag1",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// HVAC usage is already label-encoded as "on" in the training data.
pub const HVAC_USAGE: f64 = 1.0;
pub const LIGHTING_USAGE: f64 = 0.0;

/// The six user-adjustable operating parameters.
///
/// Missing fields take the dashboard defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ParameterInputs {
    /// Outdoor temperature (°C)
    #[validate(range(min = 0, max = 50))]
    pub temperature: i32,
    /// Relative humidity (%)
    #[validate(range(min = 0, max = 100))]
    pub humidity: i32,
    /// Conditioned floor area (sq ft)
    #[validate(range(min = 500, max = 5000))]
    pub square_footage: i32,
    /// People in the building
    #[validate(range(min = 0, max = 300))]
    pub occupancy: i32,
    /// On-site renewable output (kW)
    #[validate(range(min = 0.0, max = 100.0), custom(function = "finite"))]
    pub renewable_energy: f64,
    /// Energy consumed during the previous hour (kWh)
    #[validate(range(min = 0.0), custom(function = "finite"))]
    pub energy_lag1: f64,
}

/// Range checks let NaN through, and an open upper bound lets infinity through.
fn finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite"))
    }
}

impl Default for ParameterInputs {
    fn default() -> Self {
        Self {
            temperature: 28,
            humidity: 45,
            square_footage: 1500,
            occupancy: 10,
            renewable_energy: 10.0,
            energy_lag1: 35.0,
        }
    }
}

/// Bounds and default of one input control, as shown in the sidebar.
#[derive(Debug, Clone, Serialize)]
pub struct InputSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub default: f64,
    pub step: f64,
}

pub fn input_specs() -> Vec<InputSpec> {
    let d = ParameterInputs::default();
    vec![
        InputSpec {
            key: "temperature",
            label: "Outdoor Temperature (°C)",
            min: 0.0,
            max: Some(50.0),
            default: d.temperature as f64,
            step: 1.0,
        },
        InputSpec {
            key: "humidity",
            label: "Humidity (%)",
            min: 0.0,
            max: Some(100.0),
            default: d.humidity as f64,
            step: 1.0,
        },
        InputSpec {
            key: "square_footage",
            label: "Square Footage / Area",
            min: 500.0,
            max: Some(5000.0),
            default: d.square_footage as f64,
            step: 1.0,
        },
        InputSpec {
            key: "occupancy",
            label: "Occupancy (People)",
            min: 0.0,
            max: Some(300.0),
            default: d.occupancy as f64,
            step: 1.0,
        },
        InputSpec {
            key: "renewable_energy",
            label: "Renewable Energy Output (kW)",
            min: 0.0,
            max: Some(100.0),
            default: d.renewable_energy,
            step: 0.1,
        },
        InputSpec {
            key: "energy_lag1",
            label: "Last Hour Energy (kWh)",
            min: 0.0,
            max: None,
            default: d.energy_lag1,
            step: 0.1,
        },
    ]
}

/// Calendar fields derived from the wall clock at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeFeatures {
    /// Day of year, 1-based
    pub day_of_year: u32,
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: u32,
    /// Saturday or Sunday
    pub is_weekend: bool,
}

impl TimeFeatures {
    pub fn from_datetime(at: &DateTime<FixedOffset>) -> Self {
        let day_of_week = at.weekday().num_days_from_monday();
        Self {
            day_of_year: at.ordinal(),
            hour: at.hour(),
            day_of_week,
            is_weekend: day_of_week >= 5,
        }
    }
}

/// One row submitted to the scaler and the models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    #[serde(rename = "SquareFootage")]
    pub square_footage: f64,
    #[serde(rename = "Occupancy")]
    pub occupancy: f64,
    #[serde(rename = "HVACUsage")]
    pub hvac_usage: f64,
    #[serde(rename = "LightingUsage")]
    pub lighting_usage: f64,
    #[serde(rename = "RenewableEnergy")]
    pub renewable_energy: f64,
    #[serde(rename = "DayOfWeek")]
    pub day_of_week: f64,
    #[serde(rename = "Holiday")]
    pub holiday: f64,
    #[serde(rename = "Hour")]
    pub hour: f64,
    #[serde(rename = "DayOfYear")]
    pub day_of_year: f64,
    #[serde(rename = "Energy_Lag1")]
    pub energy_lag1: f64,
}

impl FeatureRecord {
    /// Combine the operating parameters with the calendar fields.
    ///
    /// Weekends are encoded as holidays; the training data carried no
    /// separate public-holiday calendar.
    pub fn collect(inputs: &ParameterInputs, time: &TimeFeatures) -> Self {
        Self {
            temperature: inputs.temperature as f64,
            humidity: inputs.humidity as f64,
            square_footage: inputs.square_footage as f64,
            occupancy: inputs.occupancy as f64,
            hvac_usage: HVAC_USAGE,
            lighting_usage: LIGHTING_USAGE,
            renewable_energy: inputs.renewable_energy,
            day_of_week: time.day_of_week as f64,
            holiday: if time.is_weekend { 1.0 } else { 0.0 },
            hour: time.hour as f64,
            day_of_year: time.day_of_year as f64,
            energy_lag1: inputs.energy_lag1,
        }
    }

    /// Values in [`FEATURE_NAMES`] order.
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.temperature,
            self.humidity,
            self.square_footage,
            self.occupancy,
            self.hvac_usage,
            self.lighting_usage,
            self.renewable_energy,
            self.day_of_week,
            self.holiday,
            self.hour,
            self.day_of_year,
            self.energy_lag1,
        ]
    }

    pub fn named_values(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.values())
    }
}
