//! # Orbital platform scenes
//!
//! A platform scene is read (by an external raster reader) as a small window of pixels
//! around the station, one window per sublayer. This module turns those raw windows
//! into per-day cloud statistics.
//!
//! ## Platform description
//!
//! [`PlatformDescriptor`] names the sublayers to read, which of them are essential, and
//! the bit layout of the packed quality layer. The essential list always holds `CRGT`,
//! `CRNM` and `NPA`; any further entry is an extra layer a scene must carry.
//! [`PlatformDescriptor::modis`] is the built-in description:
//!
//! | Sublayer                           | Abbreviation | Content                          |
//! |------------------------------------|--------------|----------------------------------|
//! | Coarse Resolution Granule Time     | `CRGT`       | acquisition time, packed `HHMM`  |
//! | Coarse Resolution Number Mapping   | `CRNM`       | packed per-pixel category counts |
//! | n pixels averaged                  | `NPA`        | fine pixels behind each pixel    |
//!
//! ## Processing
//!
//! [`PlatformDescriptor::process`]:
//!
//! 1. checks that every essential layer is present,
//! 2. takes the most frequent `CRGT` value as the acquisition time of day,
//! 3. sums `NPA` into the window's total weight `n_total`,
//! 4. accumulates the `CRNM` sub-fields ([`bitfield::decode_accumulate`]),
//! 5. converts each field into a percentage of `n_total`.
pub mod bitfield;

use hifitime::Epoch;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{
    Percent, LAYER_GRANULE_TIME, LAYER_NUMBER_MAPPING, LAYER_PIXELS_AVERAGED,
};
use crate::correlation::{AsFields, FieldValue};
use crate::time::{ObservationKey, TimeOfDay};
use bitfield::{decode_accumulate, BitRanges};

/// Layers [`PlatformDescriptor::process`] reads whatever the descriptor lists.
const REQUIRED_LAYERS: [&str; 3] = [LAYER_GRANULE_TIME, LAYER_NUMBER_MAPPING, LAYER_PIXELS_AVERAGED];

/// Platform description as found in configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DescriptorRecord {
    name: String,
    layers: Vec<String>,
    essential: Vec<String>,
    #[serde(default)]
    num_mappings: BitRanges,
}

/// Which sublayers a platform provides and how its quality layer is packed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DescriptorRecord", into = "DescriptorRecord")]
pub struct PlatformDescriptor {
    name: String,
    layers: Vec<String>,
    essential: Vec<String>,
    num_mappings: BitRanges,
}

impl TryFrom<DescriptorRecord> for PlatformDescriptor {
    type Error = CloudCorrError;

    fn try_from(record: DescriptorRecord) -> Result<Self, Self::Error> {
        PlatformDescriptor::new(
            record.name,
            record.layers,
            record.essential,
            record.num_mappings,
        )
    }
}

impl From<PlatformDescriptor> for DescriptorRecord {
    fn from(descriptor: PlatformDescriptor) -> Self {
        DescriptorRecord {
            name: descriptor.name,
            layers: descriptor.layers,
            essential: descriptor.essential,
            num_mappings: descriptor.num_mappings,
        }
    }
}

impl Default for PlatformDescriptor {
    fn default() -> Self {
        PlatformDescriptor::modis()
    }
}

impl PlatformDescriptor {
    /// Build a descriptor.
    ///
    /// Arguments
    /// -----------------
    /// * `layers`: full sublayer names to look for in a scene file.
    /// * `essential`: abbreviations a scene must carry; must include `CRGT`, `CRNM`
    ///   and `NPA`.
    /// * `num_mappings`: bit layout of the `CRNM` layer.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::InvalidDescriptor`] naming the first required layer missing
    ///   from `essential`.
    pub fn new(
        name: impl Into<String>,
        layers: Vec<String>,
        essential: Vec<String>,
        num_mappings: BitRanges,
    ) -> Result<Self, CloudCorrError> {
        if let Some(required) = REQUIRED_LAYERS
            .iter()
            .find(|required| !essential.iter().any(|layer| layer == *required))
        {
            return Err(CloudCorrError::InvalidDescriptor(format!(
                "essential layers must include {required}"
            )));
        }

        Ok(PlatformDescriptor {
            name: name.into(),
            layers,
            essential,
            num_mappings,
        })
    }

    pub fn modis() -> Self {
        PlatformDescriptor {
            name: "MODIS".into(),
            layers: vec![
                "Coarse Resolution Granule Time".into(),
                "Coarse Resolution Number Mapping".into(),
                "n pixels averaged".into(),
            ],
            essential: vec![
                LAYER_GRANULE_TIME.into(),
                LAYER_NUMBER_MAPPING.into(),
                LAYER_PIXELS_AVERAGED.into(),
            ],
            num_mappings: BitRanges::num_mappings(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn essential(&self) -> &[String] {
        &self.essential
    }

    pub fn num_mappings(&self) -> &BitRanges {
        &self.num_mappings
    }

    /// Upper-cased first letter of each word: `"n pixels averaged"` -> `"NPA"`.
    pub fn abbreviation(layer: &str) -> String {
        layer
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Match the descriptor's layers against the sublayer names found in a scene file.
    ///
    /// Arguments
    /// -----------------
    /// * `subdatasets`: full sublayer names as listed by the raster reader.
    ///
    /// Return
    /// ----------
    /// * abbreviation -> matching sublayer name, in descriptor order.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::MissingLayer`] naming the first layer with no match.
    pub fn find_sublayers<'a, S: AsRef<str>>(
        &self,
        subdatasets: &'a [S],
    ) -> Result<IndexMap<String, &'a str>, CloudCorrError> {
        self.layers
            .iter()
            .map(|layer| {
                subdatasets
                    .iter()
                    .map(AsRef::<str>::as_ref)
                    .find(|name| name.contains(layer.as_str()))
                    .map(|name| (Self::abbreviation(layer), name))
                    .ok_or_else(|| CloudCorrError::MissingLayer(layer.clone()))
            })
            .collect()
    }

    /// Reduce the raw windows of one scene to its statistics.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::MissingLayer`] if an essential layer is absent.
    /// * [`CloudCorrError::EmptyInput`] if the granule time window is empty.
    /// * [`CloudCorrError::InvalidTimeOfDay`] if the granule time is not a valid `HHMM`.
    /// * [`CloudCorrError::Division`] if the `NPA` window sums to zero.
    pub fn process(&self, raw: &RawLayers) -> Result<PlatformSceneStats, CloudCorrError> {
        if let Some(missing) = self
            .essential
            .iter()
            .find(|layer| raw.get(layer.as_str()).is_none())
        {
            return Err(CloudCorrError::MissingLayer(missing.clone()));
        }

        let granule_time = granule_time_mode(raw.layer(LAYER_GRANULE_TIME)?)?;
        let time_utc = TimeOfDay::from_hhmm(granule_time)?;

        let n_total: u64 = raw
            .layer(LAYER_PIXELS_AVERAGED)?
            .iter()
            .map(|v| u64::from(*v))
            .sum();

        let totals = decode_accumulate(
            raw.layer(LAYER_NUMBER_MAPPING)?.iter().copied(),
            &self.num_mappings,
        );
        let percents = totals.percentages(n_total)?;

        Ok(PlatformSceneStats {
            time_utc,
            n_total,
            counts: totals.iter().map(|(k, v)| (k.to_string(), v)).collect(),
            percents,
        })
    }
}

/// Most frequent value of the granule time window; ties go to the smallest value.
fn granule_time_mode(window: &[u32]) -> Result<u32, CloudCorrError> {
    window
        .iter()
        .counts()
        .into_iter()
        .sorted_by(|(va, ca), (vb, cb)| cb.cmp(ca).then(va.cmp(vb)))
        .map(|(value, _)| *value)
        .next()
        .ok_or_else(|| CloudCorrError::EmptyInput(format!("{LAYER_GRANULE_TIME} window")))
}

/// Raw pixel windows of one scene, keyed by sublayer abbreviation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLayers {
    windows: IndexMap<String, Vec<u32>>,
}

impl RawLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the flattened window of one sublayer.
    pub fn with_layer(mut self, abbreviation: impl Into<String>, window: Vec<u32>) -> Self {
        self.windows.insert(abbreviation.into(), window);
        self
    }

    pub fn insert(&mut self, abbreviation: impl Into<String>, window: Vec<u32>) {
        self.windows.insert(abbreviation.into(), window);
    }

    pub fn get(&self, abbreviation: &str) -> Option<&[u32]> {
        self.windows.get(abbreviation).map(Vec::as_slice)
    }

    fn layer(&self, abbreviation: &str) -> Result<&[u32], CloudCorrError> {
        self.get(abbreviation)
            .ok_or_else(|| CloudCorrError::MissingLayer(abbreviation.to_string()))
    }
}

/// Cloud statistics of one platform scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSceneStats {
    /// Acquisition time of day (UTC) from the granule time layer
    pub time_utc: TimeOfDay,
    /// Summed observation weight of the window
    pub n_total: u64,
    /// Accumulated sub-field counts, in bit-range order
    pub counts: IndexMap<String, u64>,
    /// `counts` as percentages of `n_total`
    pub percents: IndexMap<String, Percent>,
}

impl PlatformSceneStats {
    /// Actual acquisition instant of the scene for `key`.
    pub fn acquisition(&self, key: &ObservationKey) -> Epoch {
        key.epoch_at(self.time_utc)
    }
}

impl AsFields for PlatformSceneStats {
    fn fields(&self) -> IndexMap<String, FieldValue> {
        let mut fields = IndexMap::new();
        fields.insert("time_utc".to_string(), FieldValue::Text(self.time_utc.to_string()));
        fields.insert("n_total".to_string(), FieldValue::Count(self.n_total));
        for (name, count) in &self.counts {
            fields.insert(name.clone(), FieldValue::Count(*count));
        }
        for (name, percent) in &self.percents {
            fields.insert(format!("percent_{name}"), FieldValue::Real(*percent));
        }
        fields
    }
}
