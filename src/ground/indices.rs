//! Brightness and saturation indices of a sky photograph.
//!
//! With every channel scaled to `[0, 1]`:
//!
//! ```text
//! BI = (R + G + B) / 3
//! SI = (B - R) / (B + R)
//! ```
//!
//! Pixels hidden by the station sky mask (horizon, buildings, the camera housing) are
//! set to `NaN` in both indices, as is `SI` wherever `B + R == 0`.
use nalgebra::DMatrix;

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{BrightnessIndex, SaturationIndex, CHANNEL_MAX};

/// An 8-bit RGB image as three channel planes of identical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    r: DMatrix<u8>,
    g: DMatrix<u8>,
    b: DMatrix<u8>,
}

impl RgbImage {
    /// Errors
    /// ----------
    /// * [`CloudCorrError::ShapeMismatch`] if the planes differ in shape.
    pub fn new(r: DMatrix<u8>, g: DMatrix<u8>, b: DMatrix<u8>) -> Result<Self, CloudCorrError> {
        for plane in [&g, &b] {
            if plane.shape() != r.shape() {
                return Err(CloudCorrError::ShapeMismatch {
                    left: r.shape(),
                    right: plane.shape(),
                });
            }
        }
        Ok(RgbImage { r, g, b })
    }

    /// Build from row-major interleaved `RGBRGB…` bytes, the `(H, W, 3)` layout image
    /// decoders produce.
    pub fn from_interleaved(nrows: usize, ncols: usize, data: &[u8]) -> Result<Self, CloudCorrError> {
        if data.len() != nrows * ncols * 3 {
            return Err(CloudCorrError::ShapeMismatch {
                left: (nrows, ncols * 3),
                right: (data.len() / 3, 3),
            });
        }
        let plane = |channel: usize| {
            DMatrix::from_fn(nrows, ncols, |row, col| data[(row * ncols + col) * 3 + channel])
        };
        Ok(RgbImage {
            r: plane(0),
            g: plane(1),
            b: plane(2),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.r.shape()
    }
}

/// Compute the `(BI, SI)` index images.
///
/// Arguments
/// -----------------
/// * `image`: the sky photograph.
/// * `sky_mask`: `true` where the pixel shows sky; `None` keeps every pixel.
///
/// Errors
/// ----------
/// * [`CloudCorrError::ShapeMismatch`] if the mask does not match the image.
pub fn color_indices(
    image: &RgbImage,
    sky_mask: Option<&DMatrix<bool>>,
) -> Result<(DMatrix<BrightnessIndex>, DMatrix<SaturationIndex>), CloudCorrError> {
    if let Some(mask) = sky_mask {
        if mask.shape() != image.shape() {
            return Err(CloudCorrError::ShapeMismatch {
                left: image.shape(),
                right: mask.shape(),
            });
        }
    }

    let (nrows, ncols) = image.shape();
    let visible = |row: usize, col: usize| sky_mask.map_or(true, |mask| mask[(row, col)]);
    let channel =
        |plane: &DMatrix<u8>, row: usize, col: usize| f64::from(plane[(row, col)]) / CHANNEL_MAX;

    let bi = DMatrix::from_fn(nrows, ncols, |row, col| {
        if !visible(row, col) {
            return f64::NAN;
        }
        (channel(&image.r, row, col) + channel(&image.g, row, col) + channel(&image.b, row, col))
            / 3.0
    });

    let si = DMatrix::from_fn(nrows, ncols, |row, col| {
        let r = channel(&image.r, row, col);
        let b = channel(&image.b, row, col);
        if !visible(row, col) || b + r == 0.0 {
            return f64::NAN;
        }
        (b - r) / (b + r)
    });

    Ok((bi, si))
}

#[cfg(test)]
mod indices_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_indices_of_known_pixels() {
        // white, pure blue, black
        let image = RgbImage::from_interleaved(1, 3, &[255, 255, 255, 0, 0, 255, 0, 0, 0]).unwrap();
        let (bi, si) = color_indices(&image, None).unwrap();

        assert_relative_eq!(bi[(0, 0)], 1.0);
        assert_relative_eq!(si[(0, 0)], 0.0);
        assert_relative_eq!(bi[(0, 1)], 1.0 / 3.0);
        assert_relative_eq!(si[(0, 1)], 1.0);
        assert_relative_eq!(bi[(0, 2)], 0.0);
        assert!(si[(0, 2)].is_nan());
    }

    #[test]
    fn test_sky_mask_blanks_pixels() {
        let image = RgbImage::new(
            DMatrix::from_element(2, 2, 100),
            DMatrix::from_element(2, 2, 120),
            DMatrix::from_element(2, 2, 200),
        )
        .unwrap();
        let mask = DMatrix::from_row_slice(2, 2, &[true, false, true, true]);

        let (bi, si) = color_indices(&image, Some(&mask)).unwrap();
        assert!(bi[(0, 1)].is_nan() && si[(0, 1)].is_nan());
        assert_relative_eq!(bi[(1, 0)], 420.0 / 765.0, epsilon = 1e-12);
        assert_relative_eq!(si[(1, 1)], 100.0 / 300.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_checks() {
        assert!(RgbImage::new(
            DMatrix::from_element(2, 2, 0),
            DMatrix::from_element(2, 3, 0),
            DMatrix::from_element(2, 2, 0),
        )
        .is_err());
        assert!(RgbImage::from_interleaved(2, 2, &[0; 11]).is_err());

        let image = RgbImage::from_interleaved(2, 2, &[0; 12]).unwrap();
        let mask = DMatrix::from_element(3, 2, true);
        assert_eq!(
            color_indices(&image, Some(&mask)),
            Err(CloudCorrError::ShapeMismatch {
                left: (2, 2),
                right: (3, 2)
            })
        );
    }
}
