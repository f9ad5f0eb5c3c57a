//! # (BI, SI) decision boundary
//!
//! A ground pixel is placed in the plane of its brightness index (x) and saturation
//! index (y). A fixed piecewise-linear curve splits the plane into cloud and clear
//! regions. The canonical curve ([`DecisionBoundary::canonical`]):
//!
//! ```text
//!  SI
//!  1.0 *
//!      |
//!  0.6 |  *
//!      |
//!  0.35|          *
//!  0.15|                       *
//!  0.1 |                             *
//!  0.0 +-----------------------------------*--  BI
//!      0  0.1     0.35         0.7   0.8   1
//! ```
//!
//! ## Classification rule
//!
//! Vertices are scanned in order (descending y). The first vertex whose y is strictly
//! below the point's y gives `x_b`:
//!
//! - no such vertex (y at or below the lowest vertex): [`CloudLabel::Clear`];
//! - `point.x >= x_b`: [`CloudLabel::Cloud`];
//! - otherwise: [`CloudLabel::Clear`].
//!
//! Points whose x lies outside `[min x, max x]` of the boundary, or with a `NaN`
//! index, cannot be classified and fail with [`CloudCorrError::Domain`].
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{BrightnessIndex, Percent, SaturationIndex, BOUNDARY_X, BOUNDARY_Y};
use crate::statistics::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloudLabel {
    Cloud,
    Clear,
}

/// Boundary vertices as two parallel coordinate lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoundaryVertices {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Piecewise-linear curve in (BI, SI) space, vertices sorted by descending y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundaryVertices", into = "BoundaryVertices")]
pub struct DecisionBoundary {
    vertices: Vec<(BrightnessIndex, SaturationIndex)>,
    x_min: f64,
    x_max: f64,
}

impl Default for DecisionBoundary {
    fn default() -> Self {
        DecisionBoundary::canonical()
    }
}

impl DecisionBoundary {
    /// Build a boundary from its x and y coordinates.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::InvalidBoundary`] if the lists are empty or differ in length,
    ///   hold a non-finite value, x decreases somewhere, or y increases somewhere.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, CloudCorrError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(CloudCorrError::InvalidBoundary(format!(
                "{} x and {} y coordinates",
                x.len(),
                y.len()
            )));
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(CloudCorrError::InvalidBoundary(
                "non-finite coordinate".into(),
            ));
        }
        if x.windows(2).any(|w| w[1] < w[0]) {
            return Err(CloudCorrError::InvalidBoundary(
                "x coordinates must be non-decreasing".into(),
            ));
        }
        if y.windows(2).any(|w| w[1] > w[0]) {
            return Err(CloudCorrError::InvalidBoundary(
                "y coordinates must be non-increasing".into(),
            ));
        }

        Ok(DecisionBoundary {
            vertices: x.iter().copied().zip(y.iter().copied()).collect(),
            x_min: x.iter().copied().fold(f64::INFINITY, f64::min),
            x_max: x.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// `x = [0, .1, .35, .7, .8, 1]`, `y = [1, .6, .35, .15, .1, 0]`.
    pub fn canonical() -> Self {
        DecisionBoundary {
            vertices: BOUNDARY_X.iter().copied().zip(BOUNDARY_Y).collect(),
            x_min: BOUNDARY_X[0],
            x_max: BOUNDARY_X[BOUNDARY_X.len() - 1],
        }
    }

    pub fn vertices(&self) -> &[(BrightnessIndex, SaturationIndex)] {
        &self.vertices
    }

    /// Range of x values the boundary can classify.
    pub fn domain(&self) -> (f64, f64) {
        (self.x_min, self.x_max)
    }

    /// Label one (BI, SI) point.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::Domain`] if `x` is outside [`DecisionBoundary::domain`] or
    ///   either index is `NaN`.
    pub fn classify(&self, x: BrightnessIndex, y: SaturationIndex) -> Result<CloudLabel, CloudCorrError> {
        if y.is_nan() || !(self.x_min..=self.x_max).contains(&x) {
            return Err(CloudCorrError::Domain {
                x,
                y,
                min: self.x_min,
                max: self.x_max,
            });
        }

        let label = match self.vertices.iter().find(|(_, vy)| *vy < y) {
            None => CloudLabel::Clear,
            Some((x_b, _)) if x >= *x_b => CloudLabel::Cloud,
            Some(_) => CloudLabel::Clear,
        };
        Ok(label)
    }

    /// Label every pixel of a (BI, SI) image pair.
    ///
    /// Pixels where either index is `NaN` stay unclassified (`None`) at the same
    /// position and do not count as valid.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::ShapeMismatch`] if the two images differ in shape.
    /// * [`CloudCorrError::Domain`] for the first valid pixel outside the domain.
    pub fn classify_image(
        &self,
        bi: &DMatrix<f64>,
        si: &DMatrix<f64>,
    ) -> Result<CloudMask, CloudCorrError> {
        if bi.shape() != si.shape() {
            return Err(CloudCorrError::ShapeMismatch {
                left: bi.shape(),
                right: si.shape(),
            });
        }

        // DMatrix storage is column-major, iter() walks it in storage order
        let labels = bi
            .iter()
            .zip(si.iter())
            .map(|(x, y)| {
                if x.is_nan() || y.is_nan() {
                    Ok(None)
                } else {
                    self.classify(*x, *y).map(Some)
                }
            })
            .collect::<Result<Vec<Option<CloudLabel>>, CloudCorrError>>()?;

        let (nrows, ncols) = bi.shape();
        Ok(CloudMask {
            labels: DMatrix::from_vec(nrows, ncols, labels),
        })
    }
}

impl TryFrom<BoundaryVertices> for DecisionBoundary {
    type Error = CloudCorrError;

    fn try_from(v: BoundaryVertices) -> Result<Self, Self::Error> {
        DecisionBoundary::new(&v.x, &v.y)
    }
}

impl From<DecisionBoundary> for BoundaryVertices {
    fn from(b: DecisionBoundary) -> Self {
        let (x, y) = b.vertices.into_iter().unzip();
        BoundaryVertices { x, y }
    }
}

/// Per-pixel labels of one image; `None` marks unclassified (missing) pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudMask {
    labels: DMatrix<Option<CloudLabel>>,
}

impl CloudMask {
    pub fn shape(&self) -> (usize, usize) {
        self.labels.shape()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<CloudLabel> {
        self.labels.get((row, col)).copied().flatten()
    }

    pub fn labels(&self) -> &DMatrix<Option<CloudLabel>> {
        &self.labels
    }

    fn count(&self, label: CloudLabel) -> usize {
        self.labels.iter().filter(|l| **l == Some(label)).count()
    }

    /// Pixels with both indices present.
    pub fn valid_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }

    pub fn cloud_count(&self) -> usize {
        self.count(CloudLabel::Cloud)
    }

    pub fn clear_count(&self) -> usize {
        self.count(CloudLabel::Clear)
    }

    /// `100 * (1 - clear / valid)`, rounded to two decimals.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::Division`] when no pixel is valid.
    pub fn percent_cloud(&self) -> Result<Percent, CloudCorrError> {
        let valid = self.valid_count();
        if valid == 0 {
            return Err(CloudCorrError::Division("percent_cloud".into()));
        }
        Ok(round2(100.0 * (1.0 - self.clear_count() as f64 / valid as f64)))
    }
}
