//! Cloud-reduced best-pixel composites
//!
//! Pipeline, per build:
//! 1. Mask each image with its cloud score (ANDed with existing validity)
//! 2. Attach the selection index band to each masked image
//! 3. Quality-mosaic the sequence on the selection index
//! 4. Compute the derived indices once on the finished composite
//!
//! The output carries the reflectance bands, the selection band and the
//! derived bands, with the mosaic's validity mask.

use cloudless_core::{Band, Error, ImageSequence, Raster, Result};
use cloudless_parallel::ProcessingMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::imagery::bands::{BandMapping, BandRole};
use crate::imagery::cloud_mask::{clear_fraction, cloud_mask, CloudMaskParams};
use crate::imagery::indices::{with_index_using, SpectralIndex};
use crate::imagery::quality_mosaic::quality_mosaic;

/// Parameters for [`CompositeBuilder`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    /// Index maximized per pixel. Default: NDVI
    pub selection: SpectralIndex,
    /// Indices computed on the finished composite.
    /// Default: EVI2, NBR, NDMI, NDSI, NDWI
    pub derived: Vec<SpectralIndex>,
    /// Spectral role of each source band. Default: Landsat 8 OLI
    pub bands: BandMapping,
    /// Cloud masking
    pub cloud: CloudMaskParams,
    /// Execution strategy for per-image and per-row work
    pub mode: ProcessingMode,
    /// Keep the selection index as an output band. Default: true
    pub keep_selection_band: bool,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            selection: SpectralIndex::Ndvi,
            derived: vec![
                SpectralIndex::Evi2,
                SpectralIndex::Nbr,
                SpectralIndex::Ndmi,
                SpectralIndex::Ndsi,
                SpectralIndex::Ndwi,
            ],
            bands: BandMapping::landsat8(),
            cloud: CloudMaskParams::default(),
            mode: ProcessingMode::default(),
            keep_selection_band: true,
        }
    }
}

impl CompositeParams {
    /// Derived indices actually computed: first occurrence of each,
    /// without the selection index.
    pub fn derived_indices(&self) -> Vec<SpectralIndex> {
        let mut out: Vec<SpectralIndex> = Vec::with_capacity(self.derived.len());
        for &index in &self.derived {
            if index != self.selection && !out.contains(&index) {
                out.push(index);
            }
        }
        out
    }

    /// Band roles read by the selection and derived indices, in wavelength order
    pub fn required_roles(&self) -> Vec<BandRole> {
        let mut roles: Vec<BandRole> = std::iter::once(self.selection)
            .chain(self.derived.iter().copied())
            .flat_map(|i| {
                let (a, b) = i.inputs();
                [a, b]
            })
            .collect();
        roles.sort();
        roles.dedup();
        roles
    }

    /// Whether the selection band appears in the output
    pub fn outputs_selection_band(&self) -> bool {
        self.keep_selection_band || self.derived.contains(&self.selection)
    }
}

/// Builds a quality-mosaic composite from a sequence of images and their
/// cloud scores.
///
/// # Example
///
/// ```
/// use cloudless_algorithms::imagery::{CompositeBuilder, CompositeParams};
/// use cloudless_core::{Band, ImageSequence, Raster};
///
/// let scene = |nir: f64| {
///     let bands = ["B1", "B2", "B3", "B4", "B5", "B6", "B7"]
///         .iter()
///         .map(|name| Band::filled(*name, 2, 2, if *name == "B5" { nir } else { 0.1 }))
///         .collect();
///     Raster::from_bands(bands).unwrap()
/// };
/// let sequence = ImageSequence::new(vec![scene(0.3), scene(0.5)]).unwrap();
/// let scores = vec![Band::filled("cloud", 2, 2, 0.0); 2];
///
/// let composite = CompositeBuilder::new(CompositeParams::default())
///     .build(&sequence, &scores)
///     .unwrap();
/// assert_eq!(composite.value("B5", 0, 0).unwrap(), Some(0.5));
/// assert!(composite.has_band("NDVI") && composite.has_band("NDWI"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompositeBuilder {
    params: CompositeParams,
}

impl CompositeBuilder {
    pub fn new(params: CompositeParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CompositeParams {
        &self.params
    }

    /// Check everything that can fail before any pixel is touched
    pub fn validate(&self, sequence: &ImageSequence, cloud_scores: &[Band]) -> Result<()> {
        let p = &self.params;
        p.cloud.validate()?;

        if cloud_scores.len() != sequence.len() {
            return Err(Error::CloudScoreCount {
                images: sequence.len(),
                scores: cloud_scores.len(),
            });
        }
        for (i, score) in cloud_scores.iter().enumerate() {
            if score.shape() != sequence.shape() {
                return Err(Error::ShapeMismatch {
                    image: Some(i),
                    band: Some(score.name().to_string()),
                    expected: sequence.shape(),
                    found: score.shape(),
                });
            }
        }

        for role in p.required_roles() {
            sequence.require_band(p.bands.resolve(role)?)?;
        }

        let first = sequence.first();
        for index in std::iter::once(p.selection).chain(p.derived_indices()) {
            if first.has_band(index.name()) {
                return Err(Error::DuplicateBand(index.name().to_string()));
            }
        }
        Ok(())
    }

    /// Run the full pipeline
    pub fn build(&self, sequence: &ImageSequence, cloud_scores: &[Band]) -> Result<Raster> {
        let p = &self.params;
        let (rows, cols) = sequence.shape();
        let span = info_span!("composite", selection = %p.selection, images = sequence.len());
        let _guard = span.enter();

        self.validate(sequence, cloud_scores)?;
        info!(rows, cols, threshold = p.cloud.threshold, "building composite");

        let prepared = p.mode.try_map(0..sequence.len(), |i| {
            let image = &sequence.images()[i];
            let clear = cloud_mask(image, &cloud_scores[i], &p.cloud)?;
            let masked = image.masked(&clear)?;
            debug!(
                image = i,
                clear = clear_fraction(image, &clear),
                valid_pixels = masked.mask().count_valid(),
                "cloud mask applied"
            );
            // images are already spread over the pool
            with_index_using(&masked, p.selection, &p.bands, ProcessingMode::Sequential)
        })?;
        let prepared = ImageSequence::new(prepared)?;

        let mut composite = quality_mosaic(&prepared, p.selection.name(), p.mode)?;
        info!(
            valid_pixels = composite.mask().count_valid(),
            coverage = composite.mask().coverage(),
            "mosaic complete"
        );

        for index in p.derived_indices() {
            composite = with_index_using(&composite, index, &p.bands, p.mode)?;
            debug!(band = index.name(), "derived band appended");
        }

        if !p.outputs_selection_band() {
            let selection = p.selection.name();
            composite = composite.retain_bands(|b| b.name() != selection);
        }

        info!(bands = composite.bands().len(), "composite ready");
        Ok(composite)
    }
}

/// Build a composite with `params`
pub fn build_composite(
    sequence: &ImageSequence,
    cloud_scores: &[Band],
    params: &CompositeParams,
) -> Result<Raster> {
    CompositeBuilder::new(params.clone()).build(sequence, cloud_scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Landsat-like scene where every pixel has the same reflectance
    fn scene(rows: usize, cols: usize, red: f64, nir: f64) -> Raster {
        let bands = BandRole::ALL
            .iter()
            .map(|role| {
                let value = match role {
                    BandRole::Red => red,
                    BandRole::Nir => nir,
                    _ => 0.1,
                };
                Band::filled(role.landsat8(), rows, cols, value)
            })
            .collect();
        Raster::from_bands(bands).unwrap()
    }

    fn clear(rows: usize, cols: usize) -> Band {
        Band::filled("cloud", rows, cols, 0.0)
    }

    #[test]
    fn test_default_params() {
        let p = CompositeParams::default();
        assert_eq!(p.selection, SpectralIndex::Ndvi);
        assert_eq!(p.derived.len(), 5);
        assert_eq!(p.cloud.threshold, 20.0);
        assert!(p.keep_selection_band);
        assert_eq!(p.required_roles().len(), 5);
    }

    #[test]
    fn test_two_image_scenario() {
        // Image B is greener at both pixels but cloudy at pixel 0
        let a = scene(1, 2, 0.1, 0.5);
        let b = scene(1, 2, 0.5, 0.6);
        let seq = ImageSequence::new(vec![a, b]).unwrap();
        let scores = vec![
            clear(1, 2),
            Band::from_vec("cloud", vec![50.0, 5.0], 1, 2).unwrap(),
        ];

        let out = CompositeBuilder::default().build(&seq, &scores).unwrap();

        let ndvi_a = 0.4 / 0.6;
        assert_relative_eq!(out.value("NDVI", 0, 0).unwrap().unwrap(), ndvi_a, epsilon = 1e-12);
        assert_relative_eq!(out.value("NDVI", 0, 1).unwrap().unwrap(), ndvi_a, epsilon = 1e-12);
        assert_eq!(out.value("B4", 0, 0).unwrap(), Some(0.1));
        assert_eq!(out.value("B4", 0, 1).unwrap(), Some(0.1));

        // Derived bands come from A's reflectance too
        let nbr = out.value("NBR", 0, 0).unwrap().unwrap();
        assert_relative_eq!(nbr, 0.4 / 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_output_band_order() {
        let seq = ImageSequence::new(vec![scene(2, 2, 0.1, 0.4)]).unwrap();
        let out = CompositeBuilder::default().build(&seq, &[clear(2, 2)]).unwrap();
        assert_eq!(
            out.band_names(),
            vec![
                "B1", "B2", "B3", "B4", "B5", "B6", "B7", "NDVI", "EVI2", "NBR", "NDMI", "NDSI",
                "NDWI"
            ]
        );
    }

    #[test]
    fn test_all_cloudy_pixel_is_nodata() {
        let seq = ImageSequence::new(vec![scene(1, 2, 0.1, 0.5), scene(1, 2, 0.2, 0.5)]).unwrap();
        let cloudy = Band::from_vec("cloud", vec![90.0, 0.0], 1, 2).unwrap();
        let out = CompositeBuilder::default()
            .build(&seq, &[cloudy.clone(), cloudy])
            .unwrap();

        assert!(!out.is_valid(0, 0));
        assert!(out.bands().iter().all(|b| b.sample(0, 0).is_none()));
        assert!(out.is_valid(0, 1));
        assert_eq!(out.mask().count_valid(), 1);
    }

    #[test]
    fn test_selection_in_derived_is_not_duplicated() {
        let params = CompositeParams {
            derived: vec![SpectralIndex::Ndvi, SpectralIndex::Nbr, SpectralIndex::Nbr],
            ..CompositeParams::default()
        };
        assert_eq!(params.derived_indices(), vec![SpectralIndex::Nbr]);

        let seq = ImageSequence::new(vec![scene(1, 1, 0.1, 0.5)]).unwrap();
        let out = build_composite(&seq, &[clear(1, 1)], &params).unwrap();
        let names = out.band_names();
        assert_eq!(names.iter().filter(|n| **n == "NDVI").count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "NBR").count(), 1);
    }

    #[test]
    fn test_drop_selection_band() {
        let params = CompositeParams {
            keep_selection_band: false,
            derived: vec![SpectralIndex::Ndwi],
            ..CompositeParams::default()
        };
        let seq = ImageSequence::new(vec![scene(1, 1, 0.1, 0.5)]).unwrap();
        let out = build_composite(&seq, &[clear(1, 1)], &params).unwrap();
        assert!(!out.has_band("NDVI"));
        assert!(out.has_band("NDWI"));
    }

    #[test]
    fn test_alternate_selection_index() {
        // Maximize NBR instead of NDVI: B has the higher NBR despite lower NDVI
        let a = scene(1, 1, 0.1, 0.5)
            .retain_bands(|b| b.name() != "B7")
            .with_band(Band::filled("B7", 1, 1, 0.4))
            .unwrap();
        let b = scene(1, 1, 0.3, 0.5);
        let seq = ImageSequence::new(vec![a, b]).unwrap();

        let params = CompositeParams {
            selection: SpectralIndex::Nbr,
            derived: vec![SpectralIndex::Ndvi],
            ..CompositeParams::default()
        };
        let out = build_composite(&seq, &[clear(1, 1), clear(1, 1)], &params).unwrap();
        assert_eq!(out.value("B4", 0, 0).unwrap(), Some(0.3));
    }

    #[test]
    fn test_score_count_mismatch() {
        let seq = ImageSequence::new(vec![scene(1, 1, 0.1, 0.5), scene(1, 1, 0.1, 0.5)]).unwrap();
        assert!(matches!(
            CompositeBuilder::default().build(&seq, &[clear(1, 1)]),
            Err(Error::CloudScoreCount { images: 2, scores: 1 })
        ));
    }

    #[test]
    fn test_score_shape_mismatch_names_image() {
        let seq = ImageSequence::new(vec![scene(2, 2, 0.1, 0.5), scene(2, 2, 0.1, 0.5)]).unwrap();
        assert!(matches!(
            CompositeBuilder::default().build(&seq, &[clear(2, 2), clear(2, 3)]),
            Err(Error::ShapeMismatch { image: Some(1), .. })
        ));
    }

    #[test]
    fn test_missing_role_band() {
        let image = scene(1, 1, 0.1, 0.5).retain_bands(|b| b.name() != "B6");
        let seq = ImageSequence::new(vec![image]).unwrap();
        assert!(matches!(
            CompositeBuilder::default().build(&seq, &[clear(1, 1)]),
            Err(Error::MissingBand { image: Some(0), .. })
        ));
    }

    #[test]
    fn test_existing_index_band_rejected() {
        let image = scene(1, 1, 0.1, 0.5)
            .with_band(Band::filled("NDVI", 1, 1, 0.9))
            .unwrap();
        let seq = ImageSequence::new(vec![image]).unwrap();
        assert!(matches!(
            CompositeBuilder::default().build(&seq, &[clear(1, 1)]),
            Err(Error::DuplicateBand(name)) if name == "NDVI"
        ));
    }

    #[test]
    fn test_params_serde() {
        let json = r#"{ "selection": "NBR", "derived": ["NDVI"], "cloud": { "threshold": 10 } }"#;
        let p: CompositeParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.selection, SpectralIndex::Nbr);
        assert_eq!(p.derived, vec![SpectralIndex::Ndvi]);
        assert_eq!(p.cloud.threshold, 10.0);
        assert_eq!(p.bands, BandMapping::landsat8());
        assert!(p.keep_selection_band);
    }
}
