//! # Ground station images
//!
//! The ground station photographs the sky above the site. Once the image nearest to
//! the platform acquisition time is chosen, it is reduced to:
//!
//! - the BI and SI images ([`indices::color_indices`]),
//! - their descriptive statistics, missing pixels skipped,
//! - a per-pixel cloud mask ([`boundary::DecisionBoundary::classify_image`]) and its
//!   cloud percentage.
//!
//! The result is a [`GroundSceneSummary`].
pub mod boundary;
pub mod indices;

use hifitime::Epoch;
use indexmap::IndexMap;
use nalgebra::DMatrix;
use serde::Serialize;

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{Percent, Seconds};
use crate::correlation::{AsFields, FieldValue};
use crate::scenes::MatchResult;
use crate::statistics::{describe, ChannelStats, MissingPolicy};
use crate::time::serialize_epoch;
use boundary::DecisionBoundary;
use indices::{color_indices, RgbImage};

/// Cloud statistics of one ground image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundSceneSummary {
    pub bi: ChannelStats,
    pub si: ChannelStats,
    /// Pixels classified (both indices present)
    pub n_total: u64,
    pub percent_cloud: Percent,
    /// Capture time of the chosen image
    #[serde(serialize_with = "serialize_epoch")]
    pub acquisition: Epoch,
    /// Distance between the capture time and the time it was matched against
    pub delta_seconds: Seconds,
}

impl GroundSceneSummary {
    /// Summarise already computed index images.
    ///
    /// Arguments
    /// -----------------
    /// * `bi`, `si`: index images of identical shape, `NaN` for missing pixels.
    /// * `boundary`: the cloud / clear decision boundary.
    /// * `matched`: the resolution that selected this image.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::ShapeMismatch`] or [`CloudCorrError::Domain`] from the
    ///   classification.
    /// * [`CloudCorrError::EmptyInput`] if one index image has no valid pixel.
    /// * [`CloudCorrError::Division`] if no pixel could be classified.
    pub fn from_indices<H>(
        bi: &DMatrix<f64>,
        si: &DMatrix<f64>,
        boundary: &DecisionBoundary,
        matched: &MatchResult<'_, H>,
    ) -> Result<Self, CloudCorrError> {
        let mask = boundary.classify_image(bi, si)?;

        Ok(GroundSceneSummary {
            bi: describe(bi.iter().copied(), MissingPolicy::Ignore)?,
            si: describe(si.iter().copied(), MissingPolicy::Ignore)?,
            n_total: mask.valid_count() as u64,
            percent_cloud: mask.percent_cloud()?,
            acquisition: matched.chosen.timestamp,
            delta_seconds: matched.delta_seconds,
        })
    }

    /// Compute the indices of `image` and summarise them.
    pub fn from_image<H>(
        image: &RgbImage,
        sky_mask: Option<&DMatrix<bool>>,
        boundary: &DecisionBoundary,
        matched: &MatchResult<'_, H>,
    ) -> Result<Self, CloudCorrError> {
        let (bi, si) = color_indices(image, sky_mask)?;
        Self::from_indices(&bi, &si, boundary, matched)
    }
}

impl AsFields for GroundSceneSummary {
    fn fields(&self) -> IndexMap<String, FieldValue> {
        let mut fields = IndexMap::new();
        fields.insert(
            "acquisition_time".to_string(),
            FieldValue::Text(self.acquisition.to_string()),
        );
        fields.insert("time_delta".to_string(), FieldValue::Seconds(self.delta_seconds));
        fields.insert("n_total".to_string(), FieldValue::Count(self.n_total));
        for (channel, stats) in [("BI", &self.bi), ("SI", &self.si)] {
            fields.insert(format!("{channel}_mean"), FieldValue::Real(stats.mean));
            fields.insert(format!("{channel}_min"), FieldValue::Real(stats.min));
            fields.insert(format!("{channel}_max"), FieldValue::Real(stats.max));
        }
        fields.insert("percent_CLD".to_string(), FieldValue::Real(self.percent_cloud));
        fields
    }
}
