//! Named single-band sample grids

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};

use crate::error::{Error, Result};
use crate::raster::ValidityMask;

/// One pixel of one band. `None` is the explicit no-data marker.
pub type Sample = Option<f64>;

/// A named, immutable H x W grid of samples.
///
/// Sample storage is reference counted: cloning a band, renaming it or
/// placing it into another raster never copies pixel data. NaN and
/// infinities are normalized to `None` on construction, so consumers never
/// see a floating-point special value.
///
/// # Example
///
/// ```
/// use cloudless_core::Band;
///
/// let red = Band::from_vec("B4", vec![0.1, f64::NAN], 1, 2).unwrap();
/// assert_eq!(red.get(0, 0).unwrap(), Some(0.1));
/// assert_eq!(red.get(0, 1).unwrap(), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    name: String,
    data: Arc<Array2<Sample>>,
}

impl Band {
    /// Create a band from samples, normalizing non-finite values to `None`
    pub fn new(name: impl Into<String>, mut data: Array2<Sample>) -> Self {
        data.mapv_inplace(normalize);
        Self {
            name: name.into(),
            data: Arc::new(data),
        }
    }

    /// Create a band from raw values; non-finite values become no-data
    pub fn from_values(name: impl Into<String>, values: Array2<f64>) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(values.mapv(|v| normalize(Some(v)))),
        }
    }

    /// Create a band from row-major raw values
    pub fn from_vec(
        name: impl Into<String>,
        values: Vec<f64>,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_values(name, array))
    }

    /// Create a band with every pixel set to `value`
    pub fn filled(name: impl Into<String>, rows: usize, cols: usize, value: f64) -> Self {
        Self::from_values(name, Array2::from_elem((rows, cols), value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same samples under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Arc::clone(&self.data),
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Sample at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<Sample> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Sample at (row, col); `None` when out of bounds
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> Sample {
        self.data.get((row, col)).copied().flatten()
    }

    pub fn view(&self) -> ArrayView2<'_, Sample> {
        self.data.view()
    }

    /// Min, max and mean over defined samples, optionally restricted to a mask
    pub fn statistics(&self, mask: Option<&ValidityMask>) -> BandStatistics {
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        for ((row, col), sample) in self.data.indexed_iter() {
            if let Some(m) = mask {
                if !m.is_valid(row, col) {
                    continue;
                }
            }
            let Some(v) = *sample else { continue };
            min = Some(min.map_or(v, |m| m.min(v)));
            max = Some(max.map_or(v, |m| m.max(v)));
            sum += v;
            count += 1;
        }

        BandStatistics {
            min,
            max,
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
            nodata_count: self.data.len() - count,
        }
    }
}

#[inline]
fn normalize(sample: Sample) -> Sample {
    sample.filter(|v| v.is_finite())
}

/// Basic statistics for a band
#[derive(Debug, Clone, PartialEq)]
pub struct BandStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
