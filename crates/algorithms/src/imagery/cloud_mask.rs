//! Cloud masking from an externally computed per-pixel cloud score

use cloudless_core::{Band, Error, Raster, Result, ValidityMask};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Highest cloud score (on a 0-100 scale) still considered clear
pub const DEFAULT_CLOUD_THRESHOLD: f64 = 20.0;

/// Parameters for cloud masking
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudMaskParams {
    /// Pixels with `score <= threshold` are valid. Default: 20.0
    pub threshold: f64,
}

impl Default for CloudMaskParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CLOUD_THRESHOLD,
        }
    }
}

impl CloudMaskParams {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: self.threshold.to_string(),
                reason: "must be a finite cloud score".into(),
            });
        }
        Ok(())
    }
}

/// Validity mask for `image`: `true` where `cloud_score <= threshold`.
///
/// A missing score counts as cloudy, never as clear.
///
/// # Arguments
/// * `image` - Raster the score is aligned to
/// * `cloud_score` - Per-pixel cloud likelihood in [0, 100]
/// * `params` - Threshold
pub fn cloud_mask(
    image: &Raster,
    cloud_score: &Band,
    params: &CloudMaskParams,
) -> Result<ValidityMask> {
    params.validate()?;
    if cloud_score.shape() != image.shape() {
        return Err(Error::ShapeMismatch {
            image: None,
            band: Some(cloud_score.name().to_string()),
            expected: image.shape(),
            found: cloud_score.shape(),
        });
    }

    let threshold = params.threshold;
    let flags = cloud_score
        .view()
        .map(|score| matches!(score, Some(s) if *s <= threshold));
    Ok(ValidityMask::from_array(flags))
}

/// New raster whose mask is the image mask AND the cloud mask
pub fn apply_cloud_mask(
    image: &Raster,
    cloud_score: &Band,
    params: &CloudMaskParams,
) -> Result<Raster> {
    let clear = cloud_mask(image, cloud_score, params)?;
    image.masked(&clear)
}

/// Share of pixels that are both valid in `image` and clear in `mask`
pub fn clear_fraction(image: &Raster, mask: &ValidityMask) -> f64 {
    if image.is_empty() || image.shape() != mask.shape() {
        return 0.0;
    }
    let mut clear = 0usize;
    Zip::from(image.mask().view())
        .and(mask.view())
        .for_each(|&a, &b| clear += usize::from(a && b));
    clear as f64 / image.len() as f64
}
