//! # Cloudless Algorithms
//!
//! Cloud-reduced best-pixel compositing of multi-band image time series.
//!
//! ## Modules
//!
//! - **imagery**: band roles, spectral indices, cloud masking, quality
//!   mosaic and the composite builder

pub mod imagery;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        build_composite, cloud_mask, compute_index, quality_mosaic, select_winners, BandMapping,
        BandRole, CloudMaskParams, CompositeBuilder, CompositeParams, SpectralIndex,
    };
    pub use cloudless_core::prelude::*;
    pub use cloudless_parallel::ProcessingMode;
}
