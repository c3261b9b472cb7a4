//! # Cloudless Core
//!
//! Core types and I/O for building cloud-reduced best-pixel composites.
//!
//! This crate provides:
//! - `Band`: a named, immutable grid of optional samples
//! - `ValidityMask`: per-pixel validity shared by all bands of a raster
//! - `Raster`: an immutable multi-band grid with one validity mask
//! - `ImageSequence`: a validated time series of co-registered rasters
//! - `GeoTransform`: affine georeferencing carried through to exports
//! - Single-band GeoTIFF I/O and export sinks

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{Band, BandStatistics, GeoTransform, ImageSequence, Raster, Sample, ValidityMask};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::io::{ExportRequest, ExportSink};
    pub use crate::raster::{Band, GeoTransform, ImageSequence, Raster, Sample, ValidityMask};
}
