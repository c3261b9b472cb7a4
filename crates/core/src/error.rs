//! Error types for Cloudless
//!
//! Per-pixel problems (cloud, sensor gaps, degenerate index denominators)
//! are never errors: they travel as data in validity masks and `None`
//! samples. Everything here is structural and aborts a build before any
//! pixel is computed.

use thiserror::Error;

/// Main error type for Cloudless operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("{} has shape {found:?}, expected {expected:?}", describe(.image, .band))]
    ShapeMismatch {
        image: Option<usize>,
        band: Option<String>,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{} is missing band '{band}'", describe(.image, &None))]
    MissingBand { image: Option<usize>, band: String },

    #[error("image {image} has bands {found:?}, expected {expected:?}")]
    BandSetMismatch {
        image: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Band '{0}' already exists in raster")]
    DuplicateBand(String),

    #[error("Image sequence is empty")]
    EmptySequence,

    #[error("Got {scores} cloud score grids for {images} images")]
    CloudScoreCount { images: usize, scores: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Export '{description}' covers {pixels} pixels, limit is {max_pixels}")]
    ExportTooLarge {
        description: String,
        pixels: u64,
        max_pixels: u64,
    },

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("{0}")]
    Other(String),
}

fn describe(image: &Option<usize>, band: &Option<String>) -> String {
    match (image, band) {
        (Some(i), Some(b)) => format!("image {i} band '{b}'"),
        (Some(i), None) => format!("image {i}"),
        (None, Some(b)) => format!("band '{b}'"),
        (None, None) => "raster".to_string(),
    }
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {e}"))
    }
}

/// Result type alias for Cloudless operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_names_image_and_band() {
        let err = Error::ShapeMismatch {
            image: Some(2),
            band: Some("B4".into()),
            expected: (10, 10),
            found: (10, 9),
        };
        let msg = err.to_string();
        assert!(msg.contains("image 2"), "{msg}");
        assert!(msg.contains("'B4'"), "{msg}");
    }

    #[test]
    fn test_missing_band_without_image() {
        let err = Error::MissingBand {
            image: None,
            band: "NDVI".into(),
        };
        assert_eq!(err.to_string(), "raster is missing band 'NDVI'");
    }
}
