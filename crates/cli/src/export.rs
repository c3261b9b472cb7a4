//! Per-band export of a finished composite

use anyhow::{Context, Result};
use cloudless_algorithms::imagery::{BandMapping, SpectralIndex};
use cloudless_core::io::{ExportRequest, ExportSink};
use cloudless_core::Raster;
use tracing::info;

use crate::config::CompositeConfig;

/// Output description for `band`.
///
/// Reflectance bands read `<prefix>_<n>_<label>` (`07July_5_nearInfrared`),
/// index bands read `<prefix>_<index>` (`07July_ndvi`).
pub fn band_description(prefix: &str, band: &str, mapping: &BandMapping) -> String {
    if let Some(role) = mapping.role_of(band) {
        return format!("{prefix}_{}_{}", role.number(), role.label());
    }
    match band.parse::<SpectralIndex>() {
        Ok(index) => format!("{prefix}_{}", index.name().to_lowercase()),
        Err(_) => format!("{prefix}_{band}"),
    }
}

/// One request per band of `composite`, in band order
pub fn export_requests(composite: &Raster, config: &CompositeConfig) -> Vec<ExportRequest> {
    composite
        .bands()
        .iter()
        .map(|band| {
            let description =
                band_description(&config.export.prefix, band.name(), &config.params.bands);
            let mut request =
                ExportRequest::new(description, band.name(), config.area_of_interest.clone());
            request.scale = config.export.scale;
            request.max_pixels = config.export.max_pixels;
            request
        })
        .collect()
}

/// Check every request up front, then hand each band to `sink`
pub fn export_composite<S: ExportSink>(
    composite: &Raster,
    config: &CompositeConfig,
    sink: &mut S,
) -> Result<Vec<String>> {
    let requests = export_requests(composite, config);
    for request in &requests {
        request
            .check(composite)
            .with_context(|| format!("Export '{}' rejected", request.description))?;
    }

    for request in &requests {
        sink.export(composite, request)
            .with_context(|| format!("Failed to export '{}'", request.description))?;
        info!(description = %request.description, "exported");
    }
    Ok(requests.into_iter().map(|r| r.description).collect())
}
