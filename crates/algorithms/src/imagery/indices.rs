//! Spectral indices computed from two reflectance bands
//!
//! Every index is a pure per-pixel function of two bands. A pixel is
//! undefined (`None`) when either input is no-data or the denominator is
//! zero; it is never coerced to 0. Values are not clamped: an index
//! outside [-1, 1] points at bad upstream reflectance and is passed
//! through as-is.

use std::fmt;
use std::str::FromStr;

use cloudless_core::{Band, Error, Raster, Result, Sample, ValidityMask};
use cloudless_parallel::ProcessingMode;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::imagery::bands::{BandMapping, BandRole};

/// Supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Two-band Enhanced Vegetation Index, as defined for this product
    Evi2,
    /// Normalized Burn Ratio
    Nbr,
    /// Normalized Difference Moisture Index
    Ndmi,
    /// Normalized Difference Snow Index
    Ndsi,
    /// Normalized Difference Water Index (McFeeters)
    Ndwi,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 6] = [
        SpectralIndex::Ndvi,
        SpectralIndex::Evi2,
        SpectralIndex::Nbr,
        SpectralIndex::Ndmi,
        SpectralIndex::Ndsi,
        SpectralIndex::Ndwi,
    ];

    /// Band name of the index in a raster, e.g. `"NDVI"`
    pub fn name(self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Evi2 => "EVI2",
            SpectralIndex::Nbr => "NBR",
            SpectralIndex::Ndmi => "NDMI",
            SpectralIndex::Ndsi => "NDSI",
            SpectralIndex::Ndwi => "NDWI",
        }
    }

    /// The (first, second) bands the formula is applied to
    pub fn inputs(self) -> (BandRole, BandRole) {
        match self {
            SpectralIndex::Ndvi => (BandRole::Nir, BandRole::Red),
            SpectralIndex::Evi2 => (BandRole::Red, BandRole::Green),
            SpectralIndex::Nbr => (BandRole::Nir, BandRole::Swir2),
            SpectralIndex::Ndmi => (BandRole::Nir, BandRole::Swir1),
            SpectralIndex::Ndsi => (BandRole::Green, BandRole::Swir1),
            SpectralIndex::Ndwi => (BandRole::Green, BandRole::Nir),
        }
    }

    /// Per-pixel value for inputs `a` and `b` in the order of [`inputs`](Self::inputs)
    #[inline]
    pub fn evaluate(self, a: f64, b: f64) -> Option<f64> {
        match self {
            SpectralIndex::Evi2 => evi2_value(a, b),
            _ => normalized_difference_value(a, b),
        }
    }

    /// Compute the index band from its two input bands
    pub fn compute(self, a: &Band, b: &Band) -> Result<Band> {
        combine(a, b, self.name(), None, ProcessingMode::default(), |x, y| self.evaluate(x, y))
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SpectralIndex::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidParameter {
                name: "index",
                value: s.to_string(),
                reason: "expected one of NDVI, EVI2, NBR, NDMI, NDSI, NDWI".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Per-pixel formulas
// ---------------------------------------------------------------------------

/// `(a - b) / (a + b)`, or `None` when `a + b` is zero
#[inline]
pub fn normalized_difference_value(a: f64, b: f64) -> Option<f64> {
    ratio(a - b, a + b)
}

/// `(red - green) / (red + 2.4 * green + 1)`
#[inline]
pub fn evi2_value(red: f64, green: f64) -> Option<f64> {
    ratio(red - green, red + 2.4 * green + 1.0)
}

#[inline]
fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || denominator.is_nan() {
        return None;
    }
    Some(numerator / denominator).filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Band-level functions
// ---------------------------------------------------------------------------

/// Normalized difference of two bands, named `"ND"`
pub fn normalized_difference(a: &Band, b: &Band) -> Result<Band> {
    combine(a, b, "ND", None, ProcessingMode::default(), normalized_difference_value)
}

/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &Band, red: &Band) -> Result<Band> {
    SpectralIndex::Ndvi.compute(nir, red)
}

/// `EVI2 = (Red - Green) / (Red + 2.4 * Green + 1)`
pub fn evi2(red: &Band, green: &Band) -> Result<Band> {
    SpectralIndex::Evi2.compute(red, green)
}

/// `NBR = (NIR - SWIR2) / (NIR + SWIR2)`
pub fn nbr(nir: &Band, swir2: &Band) -> Result<Band> {
    SpectralIndex::Nbr.compute(nir, swir2)
}

/// `NDMI = (NIR - SWIR1) / (NIR + SWIR1)`
pub fn ndmi(nir: &Band, swir1: &Band) -> Result<Band> {
    SpectralIndex::Ndmi.compute(nir, swir1)
}

/// `NDSI = (Green - SWIR1) / (Green + SWIR1)`
pub fn ndsi(green: &Band, swir1: &Band) -> Result<Band> {
    SpectralIndex::Ndsi.compute(green, swir1)
}

/// `NDWI = (Green - NIR) / (Green + NIR)`
pub fn ndwi(green: &Band, nir: &Band) -> Result<Band> {
    SpectralIndex::Ndwi.compute(green, nir)
}

/// Compute `index` from the bands of `raster` selected through `mapping`.
///
/// Pixels masked out in `raster` are `None` in the result.
pub fn compute_index(raster: &Raster, index: SpectralIndex, mapping: &BandMapping) -> Result<Band> {
    compute_index_using(raster, index, mapping, ProcessingMode::default())
}

/// [`compute_index`] with rows scheduled by `mode`
pub fn compute_index_using(
    raster: &Raster,
    index: SpectralIndex,
    mapping: &BandMapping,
    mode: ProcessingMode,
) -> Result<Band> {
    let (role_a, role_b) = index.inputs();
    let a = raster.require_band(mapping.resolve(role_a)?)?;
    let b = raster.require_band(mapping.resolve(role_b)?)?;
    combine(a, b, index.name(), Some(raster.mask()), mode, |x, y| index.evaluate(x, y))
}

/// New raster with `index` appended as a band named [`SpectralIndex::name`]
pub fn with_index(raster: &Raster, index: SpectralIndex, mapping: &BandMapping) -> Result<Raster> {
    with_index_using(raster, index, mapping, ProcessingMode::default())
}

/// [`with_index`] with rows scheduled by `mode`
pub fn with_index_using(
    raster: &Raster,
    index: SpectralIndex,
    mapping: &BandMapping,
    mode: ProcessingMode,
) -> Result<Raster> {
    raster.with_band(compute_index_using(raster, index, mapping, mode)?)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn combine<F>(
    a: &Band,
    b: &Band,
    name: &str,
    mask: Option<&ValidityMask>,
    mode: ProcessingMode,
    f: F,
) -> Result<Band>
where
    F: Fn(f64, f64) -> Option<f64> + Sync + Send,
{
    check_dimensions(a, b)?;
    let (rows, cols) = a.shape();

    let data: Vec<Sample> = mode
        .map(0..rows, |row| {
            let mut row_data = vec![None; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if mask.is_some_and(|m| !m.is_valid(row, col)) {
                    continue;
                }
                if let (Some(x), Some(y)) = (a.sample(row, col), b.sample(row, col)) {
                    *out = f(x, y);
                }
            }
            row_data
        })?
        .into_iter()
        .flatten()
        .collect();

    let array =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(Band::new(name, array))
}

fn check_dimensions(a: &Band, b: &Band) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            image: None,
            band: Some(b.name().to_string()),
            expected: a.shape(),
            found: b.shape(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
