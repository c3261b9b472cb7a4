//! Ordered collections of co-registered rasters

use crate::error::{Error, Result};
use crate::raster::Raster;

/// A validated, read-only time series of rasters.
///
/// All images share one shape and one band-name set (order may differ).
/// Sequence position is significant only for breaking ties in pixel
/// selection.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    images: Vec<Raster>,
}

impl ImageSequence {
    /// Validate and wrap a list of images. Fails on the first image whose
    /// shape or band set differs from image 0.
    pub fn new(images: Vec<Raster>) -> Result<Self> {
        let first = images.first().ok_or(Error::EmptySequence)?;
        let shape = first.shape();
        let expected = sorted_names(first);

        for (i, image) in images.iter().enumerate().skip(1) {
            if image.shape() != shape {
                return Err(Error::ShapeMismatch {
                    image: Some(i),
                    band: None,
                    expected: shape,
                    found: image.shape(),
                });
            }
            let found = sorted_names(image);
            if found != expected {
                return Err(Error::BandSetMismatch {
                    image: i,
                    expected,
                    found,
                });
            }
        }

        Ok(Self { images })
    }

    /// Fail with [`Error::MissingBand`] unless every image carries `band`
    pub fn require_band(&self, band: &str) -> Result<()> {
        match self.images.iter().position(|img| !img.has_band(band)) {
            Some(i) => Err(Error::MissingBand {
                image: Some(i),
                band: band.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn images(&self) -> &[Raster] {
        &self.images
    }

    pub fn first(&self) -> &Raster {
        &self.images[0]
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Always false: construction rejects empty sequences
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Shared (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.first().shape()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Raster> {
        self.images.iter()
    }
}

impl<'a> IntoIterator for &'a ImageSequence {
    type Item = &'a Raster;
    type IntoIter = std::slice::Iter<'a, Raster>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn sorted_names(raster: &Raster) -> Vec<String> {
    let mut names: Vec<String> = raster.band_names().into_iter().map(String::from).collect();
    names.sort();
    names
}
