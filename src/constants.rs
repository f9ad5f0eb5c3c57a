//! # Constants and type definitions for cloudcorr
//!
//! This module centralizes the **canonical tables**, **thresholds**, and **common type
//! definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - The packed quality-flag layout of the orbital platform ([`NUM_MAPPINGS`])
//! - The (BI, SI) cloud decision boundary ([`BOUNDARY_X`], [`BOUNDARY_Y`])
//! - Matching thresholds and defaults (large time delta, default time of day)
//! - Field-name prefixes used when the two sensors' results are merged

use crate::ground::GroundSceneSummary;
use crate::platform::PlatformSceneStats;
use crate::time::ObservationKey;
use indexmap::IndexMap;

// -------------------------------------------------------------------------------------------------
// Time
// -------------------------------------------------------------------------------------------------

/// Time deltas above this value (in seconds) are reported as suspect matches
pub const LARGE_DELTA_SECONDS: i64 = 7_200;

/// Time of day applied to a target when the caller does not provide one (local noon)
pub const DEFAULT_HOUR: u8 = 12;
pub const DEFAULT_MINUTE: u8 = 0;

// -------------------------------------------------------------------------------------------------
// Platform quality flags
// -------------------------------------------------------------------------------------------------

/// Width in bits of a packed per-pixel quality value
pub const QUALITY_BIT_WIDTH: u32 = 32;

/// Canonical bit-range table of the coarse-resolution number mapping layer.
///
/// Each entry is `(field, start_bit, end_bit)`, bits counted from the least-significant
/// bit, both ends inclusive.
pub const NUM_MAPPINGS: [(&str, u32, u32); 4] = [
    ("CLD", 0, 7),
    ("CLD_SHDW", 8, 15),
    ("ADJ_CLD", 16, 23),
    ("SNW", 24, 31),
];

/// Granule time layer (packed `HHMM`)
pub const LAYER_GRANULE_TIME: &str = "CRGT";
/// Packed number-mapping layer
pub const LAYER_NUMBER_MAPPING: &str = "CRNM";
/// Number of fine pixels averaged into each coarse pixel
pub const LAYER_PIXELS_AVERAGED: &str = "NPA";

// -------------------------------------------------------------------------------------------------
// Ground classification
// -------------------------------------------------------------------------------------------------

/// Brightness-index coordinates of the canonical decision boundary
pub const BOUNDARY_X: [f64; 6] = [0.0, 0.1, 0.35, 0.7, 0.8, 1.0];

/// Saturation-index coordinates of the canonical decision boundary (descending)
pub const BOUNDARY_Y: [f64; 6] = [1.0, 0.6, 0.35, 0.15, 0.1, 0.0];

/// Full scale of an 8-bit colour channel
pub const CHANNEL_MAX: f64 = 255.0;

// -------------------------------------------------------------------------------------------------
// Correlation
// -------------------------------------------------------------------------------------------------

/// Prefix of platform-side fields in a correlated record
pub const PLATFORM_PREFIX: &str = "sky_";

/// Prefix of ground-side fields in a correlated record
pub const GROUND_PREFIX: &str = "grnd_";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Signed number of seconds between two instants
pub type Seconds = i64;

/// Brightness index value
pub type BrightnessIndex = f64;

/// Saturation index value
pub type SaturationIndex = f64;

/// Percentage in `[0, 100]`
pub type Percent = f64;

/// Per-day platform results, in request order
pub type PlatformResults = IndexMap<ObservationKey, PlatformSceneStats>;

/// Per-day ground results, in request order
pub type GroundResults = IndexMap<ObservationKey, GroundSceneSummary>;
