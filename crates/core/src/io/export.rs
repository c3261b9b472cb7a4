//! Export sinks for finished composites
//!
//! A sink receives one band at a time together with a human-readable
//! description, an output scale, a pixel budget and the area of interest.
//! The area of interest is never read by the compositing code; it is
//! handed to the sink untouched.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use geo_types::Polygon;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::io::write_band;
use crate::raster::{GeoTransform, Raster};

/// Default output resolution in map units per pixel
pub const DEFAULT_EXPORT_SCALE: f64 = 30.0;

/// Default upper bound on pixels per export request
pub const DEFAULT_MAX_PIXELS: u64 = 30_000_000_000;

/// One band export
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Output name, e.g. `07July_5_nearInfrared`
    pub description: String,
    /// Band of the raster to export
    pub band: String,
    /// Area of interest, passed through to the sink
    pub region: Polygon<f64>,
    /// Output resolution in map units per pixel
    pub scale: f64,
    /// Maximum number of pixels this request may cover
    pub max_pixels: u64,
}

impl ExportRequest {
    pub fn new(
        description: impl Into<String>,
        band: impl Into<String>,
        region: Polygon<f64>,
    ) -> Self {
        Self {
            description: description.into(),
            band: band.into(),
            region,
            scale: DEFAULT_EXPORT_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    /// Reject requests for absent bands or rasters above the pixel budget
    pub fn check(&self, raster: &Raster) -> Result<()> {
        raster.require_band(&self.band)?;

        let pixels = raster.len() as u64;
        if pixels > self.max_pixels {
            return Err(Error::ExportTooLarge {
                description: self.description.clone(),
                pixels,
                max_pixels: self.max_pixels,
            });
        }

        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "scale",
                value: self.scale.to_string(),
                reason: "must be a positive number".into(),
            });
        }

        Ok(())
    }
}

/// Destination for exported bands
pub trait ExportSink {
    /// Persist `request.band` of `raster`
    fn export(&mut self, raster: &Raster, request: &ExportRequest) -> Result<()>;
}

/// Writes each request as `<dir>/<description>.tif` plus a JSON sidecar
/// describing the request.
#[derive(Debug, Clone)]
pub struct GeoTiffDirSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

#[derive(Serialize)]
struct Sidecar<'a> {
    description: &'a str,
    band: &'a str,
    scale: f64,
    max_pixels: u64,
    rows: usize,
    cols: usize,
    valid_pixels: usize,
    transform: GeoTransform,
    region: &'a Polygon<f64>,
}

impl GeoTiffDirSink {
    /// Create the sink, creating `dir` if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    /// GeoTIFF files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ExportSink for GeoTiffDirSink {
    fn export(&mut self, raster: &Raster, request: &ExportRequest) -> Result<()> {
        request.check(raster)?;

        let cell = raster.cell_size();
        if (cell - request.scale).abs() > 1e-6 * request.scale {
            warn!(
                description = %request.description,
                cell_size = cell,
                scale = request.scale,
                "raster cell size differs from export scale; writing at native resolution"
            );
        }

        let tif = self.dir.join(format!("{}.tif", request.description));
        write_band(raster, &request.band, &tif)?;

        let sidecar = Sidecar {
            description: &request.description,
            band: &request.band,
            scale: request.scale,
            max_pixels: request.max_pixels,
            rows: raster.rows(),
            cols: raster.cols(),
            valid_pixels: raster.mask().count_valid(),
            transform: *raster.transform(),
            region: &request.region,
        };
        let json = self.dir.join(format!("{}.json", request.description));
        serde_json::to_writer_pretty(BufWriter::new(File::create(&json)?), &sidecar)?;

        debug!(path = %tif.display(), band = %request.band, "exported band");
        self.written.push(tif);
        Ok(())
    }
}
