//! # Station and run configuration
//!
//! Everything a correlation run needs is passed explicitly in a [`CorrelationConfig`];
//! nothing is looked up by name or read from a default file. Both structs are plain
//! `serde` types, so the caller may load them from whichever format it uses.
//!
//! ```rust
//! use cloudcorr::station::CorrelationConfig;
//!
//! let json = r#"{ "station": { "name": "Sodankyla", "latitude": 67.37, "longitude": 26.63 } }"#;
//! let config: CorrelationConfig = serde_json::from_str(json).unwrap();
//! assert_eq!(config.large_delta_seconds, 7200);
//! ```
//!
//! Omitted fields fall back to the built-in platform description, the canonical decision
//! boundary, a 7200 s warning threshold, and noon as the target time of day (with a
//! warning).
use std::fmt;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{Seconds, LARGE_DELTA_SECONDS};
use crate::ground::boundary::DecisionBoundary;
use crate::platform::PlatformDescriptor;
use crate::reporting::WarningSink;
use crate::time::{DaySpec, TargetInstant, TimeOfDay};

/// Station coordinates as found in configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StationRecord {
    #[serde(default)]
    name: Option<String>,
    latitude: f64,
    longitude: f64,
}

/// The geographic point both sensors are sampled at.
///
/// Units
/// -----
/// * `latitude`: degrees, in `[-90, 90]`.
/// * `longitude`: degrees east, in `[-180, 360]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StationRecord")]
pub struct Station {
    pub name: Option<String>,
    latitude: NotNan<f64>,
    longitude: NotNan<f64>,
}

impl Station {
    /// Errors
    /// ----------
    /// * [`CloudCorrError::InvalidStation`] if a coordinate is `NaN` or out of range.
    pub fn new(name: Option<String>, latitude: f64, longitude: f64) -> Result<Self, CloudCorrError> {
        let invalid = || CloudCorrError::InvalidStation(format!("({latitude}, {longitude})"));

        let latitude_nn = NotNan::new(latitude).map_err(|_| invalid())?;
        let longitude_nn = NotNan::new(longitude).map_err(|_| invalid())?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=360.0).contains(&longitude) {
            return Err(invalid());
        }

        Ok(Station {
            name,
            latitude: latitude_nn,
            longitude: longitude_nn,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude.into_inner()
    }

    pub fn longitude(&self) -> f64 {
        self.longitude.into_inner()
    }
}

impl TryFrom<StationRecord> for Station {
    type Error = CloudCorrError;

    fn try_from(record: StationRecord) -> Result<Self, Self::Error> {
        Station::new(record.name, record.latitude, record.longitude)
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({}, {})", self.latitude, self.longitude),
            None => write!(f, "({}, {})", self.latitude, self.longitude),
        }
    }
}

fn default_large_delta() -> Seconds {
    LARGE_DELTA_SECONDS
}

/// Inputs of a correlation run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorrelationConfig {
    pub station: Station,

    #[serde(default)]
    pub platform: PlatformDescriptor,

    /// Time of day of every target; `None` means noon, with a warning.
    #[serde(default)]
    pub default_time_of_day: Option<TimeOfDay>,

    /// Matches further than this from their target are reported.
    #[serde(default = "default_large_delta")]
    pub large_delta_seconds: Seconds,

    #[serde(default)]
    pub boundary: DecisionBoundary,
}

impl CorrelationConfig {
    /// Configuration with every default for `station`.
    pub fn new(station: Station) -> Self {
        CorrelationConfig {
            station,
            platform: PlatformDescriptor::default(),
            default_time_of_day: None,
            large_delta_seconds: LARGE_DELTA_SECONDS,
            boundary: DecisionBoundary::default(),
        }
    }

    pub fn with_time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.default_time_of_day = Some(time_of_day);
        self
    }

    /// Target instants of `days` in `year`, at the configured time of day.
    pub fn targets(
        &self,
        days: &DaySpec,
        year: i32,
        sink: &dyn WarningSink,
    ) -> Result<Vec<TargetInstant>, CloudCorrError> {
        days.targets(year, self.default_time_of_day, sink)
    }
}
