//! Imagery algorithms for best-pixel compositing
//!
//! - Band roles: sensor band names mapped to spectral roles
//! - Spectral indices: NDVI, EVI2, NBR, NDMI, NDSI, NDWI
//! - Cloud mask: validity from an external per-pixel cloud score
//! - Quality mosaic: per-pixel maximization of a selection band
//! - Composite: the full mask → index → mosaic → derive pipeline

mod bands;
mod cloud_mask;
mod composite;
mod indices;
mod quality_mosaic;

pub use bands::{BandMapping, BandRole};
pub use cloud_mask::{
    apply_cloud_mask, clear_fraction, cloud_mask, CloudMaskParams, DEFAULT_CLOUD_THRESHOLD,
};
pub use composite::{build_composite, CompositeBuilder, CompositeParams};
pub use indices::{
    compute_index, compute_index_using, evi2, evi2_value, nbr, ndmi, ndsi, ndvi, ndwi,
    normalized_difference, normalized_difference_value, with_index, with_index_using,
    SpectralIndex,
};
pub use quality_mosaic::{mosaic_from_winners, quality_mosaic, select_winners, Candidate};
