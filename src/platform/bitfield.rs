//! # Packed quality bitfields
//!
//! The platform stores several per-pixel counts in one 32-bit word. Each count lives in
//! a contiguous slice of bits, described by a [`BitRange`] counted from the
//! least-significant bit, both ends inclusive:
//!
//! ```text
//!  bit 31                                                        bit 0
//!  | SNW (24-31) | ADJ_CLD (16-23) | CLD_SHDW (8-15) | CLD (0-7) |
//! ```
//!
//! [`decode`] splits one word; [`decode_accumulate`] sums every field over a window of
//! pixels, each pixel contributing its own sub-field value.
use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{Percent, NUM_MAPPINGS, QUALITY_BIT_WIDTH};
use crate::statistics::percent_of_total;

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2})\s*-\s*(\d{1,2})\s*$").expect("valid range regex"));

/// Inclusive bit slice `start..=end` of a 32-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    start: u32,
    end: u32,
}

impl BitRange {
    /// Errors
    /// ----------
    /// * [`CloudCorrError::InvalidBitRange`] if `start > end` or `end` is past bit 31.
    pub fn new(start: u32, end: u32) -> Result<Self, CloudCorrError> {
        if start > end || end >= QUALITY_BIT_WIDTH {
            return Err(CloudCorrError::InvalidBitRange(format!("{start}-{end}")));
        }
        Ok(BitRange { start, end })
    }

    /// Parse the `"start-end"` form (`"8-15"`).
    pub fn parse(s: &str) -> Result<Self, CloudCorrError> {
        let caps = RANGE_RE
            .captures(s)
            .ok_or_else(|| CloudCorrError::InvalidBitRange(s.to_string()))?;
        let start = caps[1]
            .parse::<u32>()
            .map_err(|_| CloudCorrError::InvalidBitRange(s.to_string()))?;
        let end = caps[2]
            .parse::<u32>()
            .map_err(|_| CloudCorrError::InvalidBitRange(s.to_string()))?;
        BitRange::new(start, end)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn width(&self) -> u32 {
        self.end - self.start + 1
    }

    /// The unsigned integer held by this slice of `value`.
    pub fn extract(&self, value: u32) -> u32 {
        let mask = (1u64 << self.width()) - 1;
        // mask keeps at most 32 bits
        ((u64::from(value) >> self.start) & mask) as u32
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Named bit ranges, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, String>",
    into = "IndexMap<String, String>"
)]
pub struct BitRanges {
    fields: IndexMap<String, BitRange>,
}

impl BitRanges {
    /// Build from `(name, "start-end")` pairs.
    pub fn parse<'a, I, S>(pairs: I) -> Result<Self, CloudCorrError>
    where
        I: IntoIterator<Item = (S, &'a str)>,
        S: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(name, range)| Ok((name.into(), BitRange::parse(range)?)))
            .collect::<Result<IndexMap<String, BitRange>, CloudCorrError>>()?;
        Ok(BitRanges { fields })
    }

    /// The canonical cloud / shadow / adjacent-cloud / snow layout.
    pub fn num_mappings() -> Self {
        let fields = NUM_MAPPINGS
            .iter()
            .map(|(name, start, end)| {
                (
                    name.to_string(),
                    BitRange {
                        start: *start,
                        end: *end,
                    },
                )
            })
            .collect();
        BitRanges { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BitRange)> {
        self.fields.iter().map(|(name, range)| (name.as_str(), range))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&BitRange> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for BitRanges {
    fn default() -> Self {
        BitRanges::num_mappings()
    }
}

impl TryFrom<IndexMap<String, String>> for BitRanges {
    type Error = CloudCorrError;

    fn try_from(map: IndexMap<String, String>) -> Result<Self, Self::Error> {
        BitRanges::parse(map.iter().map(|(k, v)| (k.clone(), v.as_str())))
    }
}

impl From<BitRanges> for IndexMap<String, String> {
    fn from(ranges: BitRanges) -> Self {
        ranges
            .fields
            .into_iter()
            .map(|(name, range)| (name, range.to_string()))
            .collect()
    }
}

/// Split one packed word into its named sub-fields.
///
/// Decoding is pure: the same word and ranges always give the same map.
pub fn decode(value: u32, ranges: &BitRanges) -> IndexMap<String, u32> {
    ranges
        .iter()
        .map(|(name, range)| (name.to_string(), range.extract(value)))
        .collect()
}

/// Per-field sums of decoded sub-field values over a window of pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldTotals {
    totals: IndexMap<String, u64>,
}

impl FieldTotals {
    pub fn get(&self, name: &str) -> Option<u64> {
        self.totals.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.totals.iter().map(|(name, total)| (name.as_str(), *total))
    }

    /// Each field total as a percentage of `total_weight`, the summed observation
    /// weight of the same window (e.g. the number of averaged fine pixels).
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::Division`] when `total_weight` is zero.
    /// * [`CloudCorrError::PercentOutOfRange`] when a field exceeds `total_weight`.
    pub fn percentages(&self, total_weight: u64) -> Result<IndexMap<String, Percent>, CloudCorrError> {
        self.totals
            .iter()
            .map(|(name, count)| {
                percent_of_total(*count as f64, total_weight as f64)
                    .map(|percent| (name.clone(), percent))
                    .map_err(|err| match err {
                        CloudCorrError::Division(_) => {
                            CloudCorrError::Division(format!("percent_{name}"))
                        }
                        other => other,
                    })
            })
            .collect()
    }
}

/// Decode every pixel and sum each sub-field across the window.
///
/// Fields are initialised to zero, so an empty window gives all-zero totals.
pub fn decode_accumulate<I>(pixels: I, ranges: &BitRanges) -> FieldTotals
where
    I: IntoIterator<Item = u32>,
{
    let mut totals: IndexMap<String, u64> =
        ranges.names().map(|name| (name.to_string(), 0)).collect();

    for pixel in pixels {
        for (name, range) in ranges.iter() {
            if let Some(total) = totals.get_mut(name) {
                *total += u64::from(range.extract(pixel));
            }
        }
    }

    FieldTotals { totals }
}
