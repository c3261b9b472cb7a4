//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{Band, BandStatistics, GeoTransform, Sample, ValidityMask};

/// An immutable, georeferenced multi-band grid.
///
/// All bands share one (rows, cols) shape and one [`ValidityMask`]. A pixel
/// whose mask entry is `false` carries no usable data in any band, whatever
/// the band samples hold.
///
/// Every operation that changes a raster returns a new value. Band samples
/// are shared between the old and new raster, never copied.
///
/// # Example
///
/// ```
/// use cloudless_core::{Band, Raster};
///
/// let raster = Raster::from_bands(vec![
///     Band::filled("B4", 2, 2, 0.1),
///     Band::filled("B5", 2, 2, 0.5),
/// ])
/// .unwrap();
///
/// assert_eq!(raster.value("B5", 1, 1).unwrap(), Some(0.5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// Bands in insertion order
    bands: Vec<Band>,
    /// Validity shared by every band
    mask: ValidityMask,
    /// Affine transformation
    transform: GeoTransform,
}

impl Raster {
    /// Create a raster from bands and a mask. Every band must match the
    /// mask's shape and band names must be unique.
    pub fn new(bands: Vec<Band>, mask: ValidityMask) -> Result<Self> {
        let shape = mask.shape();
        for (i, band) in bands.iter().enumerate() {
            if band.shape() != shape {
                return Err(Error::ShapeMismatch {
                    image: None,
                    band: Some(band.name().to_string()),
                    expected: shape,
                    found: band.shape(),
                });
            }
            if bands[..i].iter().any(|b| b.name() == band.name()) {
                return Err(Error::DuplicateBand(band.name().to_string()));
            }
        }

        Ok(Self {
            bands,
            mask,
            transform: GeoTransform::default(),
        })
    }

    /// Create a raster where every pixel is valid. The shape is taken
    /// from the first band.
    pub fn from_bands(bands: Vec<Band>) -> Result<Self> {
        let (rows, cols) = bands.first().map(Band::shape).ok_or(Error::InvalidDimensions {
            width: 0,
            height: 0,
        })?;
        Self::new(bands, ValidityMask::all_valid(rows, cols))
    }

    /// Same raster with a different geotransform
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Same bands with the mask intersected with `mask`.
    ///
    /// Pixels already invalid stay invalid.
    pub fn masked(&self, mask: &ValidityMask) -> Result<Raster> {
        Ok(Raster {
            bands: self.bands.clone(),
            mask: self.mask.and(mask)?,
            transform: self.transform,
        })
    }

    /// New raster with `band` appended after the existing bands
    pub fn with_band(&self, band: Band) -> Result<Raster> {
        let mut bands = self.bands.clone();
        bands.push(band);
        Ok(Raster::new(bands, self.mask.clone())?.with_transform(self.transform))
    }

    /// New raster keeping only bands for which `keep` returns true
    pub fn retain_bands<F>(&self, mut keep: F) -> Raster
    where
        F: FnMut(&Band) -> bool,
    {
        Raster {
            bands: self.bands.iter().filter(|b| keep(b)).cloned().collect(),
            mask: self.mask.clone(),
            transform: self.transform,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.mask.shape().0
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.mask.shape().1
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.mask.shape()
    }

    /// Total number of pixels
    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Bands

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(Band::name).collect()
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.iter().find(|b| b.name() == name)
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.band(name).is_some()
    }

    /// Band by name, or a [`Error::MissingBand`] error
    pub fn require_band(&self, name: &str) -> Result<&Band> {
        self.band(name).ok_or_else(|| Error::MissingBand {
            image: None,
            band: name.to_string(),
        })
    }

    // Validity

    pub fn mask(&self) -> &ValidityMask {
        &self.mask
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask.is_valid(row, col)
    }

    /// Usable sample of `band` at (row, col): `None` when the pixel is
    /// masked out or the sample itself is no-data.
    pub fn value(&self, band: &str, row: usize, col: usize) -> Result<Sample> {
        let band = self.require_band(band)?;
        let sample = band.get(row, col)?;
        Ok(if self.is_valid(row, col) { sample } else { None })
    }

    /// Statistics of a band over valid pixels
    pub fn band_statistics(&self, name: &str) -> Result<BandStatistics> {
        Ok(self.require_band(name)?.statistics(Some(&self.mask)))
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_band() -> Raster {
        Raster::from_bands(vec![
            Band::filled("B4", 2, 3, 0.1),
            Band::filled("B5", 2, 3, 0.5),
        ])
        .unwrap()
    }

    #[test]
    fn test_raster_creation() {
        let raster = two_band();
        assert_eq!(raster.shape(), (2, 3));
        assert_eq!(raster.len(), 6);
        assert_eq!(raster.band_names(), vec!["B4", "B5"]);
        assert_eq!(raster.mask().count_valid(), 6);
    }

    #[test]
    fn test_band_shape_mismatch() {
        let result = Raster::from_bands(vec![
            Band::filled("a", 2, 2, 0.0),
            Band::filled("b", 2, 3, 0.0),
        ]);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_duplicate_band_rejected() {
        let result = two_band().with_band(Band::filled("B4", 2, 3, 0.2));
        assert!(matches!(result, Err(Error::DuplicateBand(name)) if name == "B4"));
    }

    #[test]
    fn test_with_band_leaves_original_untouched() {
        let raster = two_band();
        let augmented = raster.with_band(Band::filled("NDVI", 2, 3, 0.66)).unwrap();
        assert!(augmented.has_band("NDVI"));
        assert!(!raster.has_band("NDVI"));
    }

    #[test]
    fn test_masked_hides_values() {
        let raster = two_band();
        let cloud =
            ValidityMask::from_vec(vec![false, true, true, true, true, true], 2, 3).unwrap();
        let masked = raster.masked(&cloud).unwrap();

        assert_eq!(masked.value("B5", 0, 0).unwrap(), None);
        assert_eq!(masked.value("B5", 0, 1).unwrap(), Some(0.5));
        assert_eq!(raster.value("B5", 0, 0).unwrap(), Some(0.5));
    }

    #[test]
    fn test_masked_is_cumulative() {
        let first =
            ValidityMask::from_vec(vec![false, true, true, true, true, true], 2, 3).unwrap();
        let second =
            ValidityMask::from_vec(vec![true, false, true, true, true, true], 2, 3).unwrap();
        let masked = two_band().masked(&first).unwrap().masked(&second).unwrap();
        assert!(!masked.is_valid(0, 0));
        assert!(!masked.is_valid(0, 1));
        assert_eq!(masked.mask().count_valid(), 4);
    }

    #[test]
    fn test_missing_band() {
        assert!(matches!(
            two_band().value("B7", 0, 0),
            Err(Error::MissingBand { .. })
        ));
    }

    #[test]
    fn test_retain_bands() {
        let only_nir = two_band().retain_bands(|b| b.name() == "B5");
        assert_eq!(only_nir.band_names(), vec!["B5"]);
    }
}
