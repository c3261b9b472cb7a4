//! Per-pixel validity shared by every band of a raster

use ndarray::{Array2, ArrayView2, Zip};

use crate::error::{Error, Result};

/// Boolean grid: `true` where a pixel's data is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    data: Array2<bool>,
}

impl ValidityMask {
    /// Mask with every pixel valid
    pub fn all_valid(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), true),
        }
    }

    pub fn from_array(data: Array2<bool>) -> Self {
        Self { data }
    }

    /// Build from row-major flags
    pub fn from_vec(flags: Vec<bool>, rows: usize, cols: usize) -> Result<Self> {
        if flags.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let data = Array2::from_shape_vec((rows, cols), flags)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { data })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Whether pixel (row, col) is valid. Out-of-bounds pixels are invalid.
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.data.get((row, col)).copied().unwrap_or(false)
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.data.view()
    }

    /// Logical AND of two masks. A pixel stays valid only if both agree.
    pub fn and(&self, other: &ValidityMask) -> Result<ValidityMask> {
        if self.shape() != other.shape() {
            return Err(Error::ShapeMismatch {
                image: None,
                band: None,
                expected: self.shape(),
                found: other.shape(),
            });
        }
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|&a, &b| a && b);
        Ok(ValidityMask { data })
    }

    /// Number of valid pixels
    pub fn count_valid(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Share of valid pixels in [0, 1]; 0 for an empty mask
    pub fn coverage(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.count_valid() as f64 / self.data.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_intersects() {
        let a = ValidityMask::from_vec(vec![true, true, false, false], 2, 2).unwrap();
        let b = ValidityMask::from_vec(vec![true, false, true, false], 2, 2).unwrap();
        let c = a.and(&b).unwrap();

        assert!(c.is_valid(0, 0));
        assert!(!c.is_valid(0, 1));
        assert!(!c.is_valid(1, 0));
        assert!(!c.is_valid(1, 1));
        assert_eq!(c.count_valid(), 1);
    }

    #[test]
    fn test_and_shape_mismatch() {
        let a = ValidityMask::all_valid(2, 2);
        let b = ValidityMask::all_valid(2, 3);
        assert!(matches!(a.and(&b), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_out_of_bounds_is_invalid() {
        let m = ValidityMask::all_valid(1, 1);
        assert!(!m.is_valid(1, 0));
    }

    #[test]
    fn test_coverage() {
        let m = ValidityMask::from_vec(vec![true, false, false, false], 1, 4).unwrap();
        assert_eq!(m.coverage(), 0.25);
        assert_eq!(ValidityMask::all_valid(0, 0).coverage(), 0.0);
    }
}
