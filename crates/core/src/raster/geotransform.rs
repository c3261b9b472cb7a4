//! Affine georeferencing carried alongside rasters

use serde::{Deserialize, Serialize};

/// North-up affine transform from pixel to map coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// Compositing never interprets the transform; it is copied from the first
/// image of a sequence onto the composite and read back by export sinks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width in map units
    pub pixel_width: f64,
    /// Pixel height in map units, negative for north-up grids
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Build from GeoTIFF ModelTiepoint `[I, J, K, X, Y, Z]` and
    /// ModelPixelScale `[sx, sy, sz]` tag values.
    pub fn from_tiepoint(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return None;
        }
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        Some(Self::new(origin_x, origin_y, scale[0], -scale[1]))
    }

    /// ModelTiepoint tag values anchoring pixel (0, 0)
    pub fn tiepoint(&self) -> [f64; 6] {
        [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0]
    }

    /// ModelPixelScale tag values
    pub fn pixel_scale(&self) -> [f64; 3] {
        [self.pixel_width.abs(), self.pixel_height.abs(), 0.0]
    }

    /// Map coordinates of the upper-left corner of a pixel
    pub fn pixel_corner(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y + row as f64 * self.pixel_height,
        )
    }

    /// Cell size (square pixels assumed)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of a `cols` x `rows` grid
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_corner(0, 0);
        let (x1, y1) = self.pixel_corner(cols, rows);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tiepoint_roundtrip() {
        let gt = GeoTransform::new(500_000.0, 7_800_000.0, 30.0, -30.0);
        let back = GeoTransform::from_tiepoint(&gt.tiepoint(), &gt.pixel_scale()).unwrap();
        assert_eq!(gt, back);
    }

    #[test]
    fn test_from_tiepoint_rejects_short_tags() {
        assert!(GeoTransform::from_tiepoint(&[0.0; 3], &[30.0, 30.0]).is_none());
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 300.0, 30.0, -30.0);
        let (min_x, min_y, max_x, max_y) = gt.bounds(10, 10);

        assert_relative_eq!(min_x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(min_y, 0.0, epsilon = 1e-10);
        assert_relative_eq!(max_x, 300.0, epsilon = 1e-10);
        assert_relative_eq!(max_y, 300.0, epsilon = 1e-10);
        assert_relative_eq!(gt.cell_size(), 30.0);
    }
}
