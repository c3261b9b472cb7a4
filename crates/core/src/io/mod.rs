//! Reading input bands and exporting composites

mod export;
mod native;

pub use export::{
    ExportRequest, ExportSink, GeoTiffDirSink, DEFAULT_EXPORT_SCALE, DEFAULT_MAX_PIXELS,
};
pub use native::{read_band, read_band_from_buffer, write_band, write_band_to_buffer};
