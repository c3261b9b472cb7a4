//! Raster data model: bands, validity masks, rasters and image sequences

mod band;
mod geotransform;
mod grid;
mod mask;
mod sequence;

pub use band::{Band, BandStatistics, Sample};
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use mask::ValidityMask;
pub use sequence::ImageSequence;
