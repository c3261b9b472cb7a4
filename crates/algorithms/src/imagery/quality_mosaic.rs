//! Quality mosaic: per-pixel best-image selection across a time series
//!
//! For every pixel independently, the image with the highest value of a
//! selection band wins and its whole band vector is copied into the
//! composite. Only images that are valid at the pixel and have a defined
//! selection value compete. Exact ties go to the earliest image in the
//! sequence. A pixel with no competitor is no-data in every band.

use cloudless_core::{Band, Error, ImageSequence, Raster, Result, Sample, ValidityMask};
use cloudless_parallel::ProcessingMode;
use ndarray::Array2;

/// One image's bid for a pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Position of the image in the sequence
    pub position: usize,
    /// Selection value at the pixel
    pub value: f64,
}

impl Candidate {
    /// The better of two candidates: higher value, then lower position.
    ///
    /// Associative and commutative, so any reduction order over a pixel's
    /// candidates yields the same winner.
    #[inline]
    pub fn merge(self, other: Candidate) -> Candidate {
        let better = other.value > self.value
            || (other.value == self.value && other.position < self.position);
        if better {
            other
        } else {
            self
        }
    }
}

/// Per-pixel winning sequence position, `None` where no image qualifies.
///
/// # Arguments
/// * `sequence` - Images carrying the selection band
/// * `selection` - Name of the band to maximize
/// * `mode` - Row scheduling; every mode gives identical output
pub fn select_winners(
    sequence: &ImageSequence,
    selection: &str,
    mode: ProcessingMode,
) -> Result<Array2<Option<usize>>> {
    sequence.require_band(selection)?;
    let (rows, cols) = sequence.shape();

    let bids: Vec<(&Band, &ValidityMask)> = sequence
        .iter()
        .map(|img| img.require_band(selection).map(|b| (b, img.mask())))
        .collect::<Result<_>>()?;

    let winners: Vec<Option<usize>> = mode
        .map(0..rows, |row| {
            (0..cols)
                .map(|col| {
                    bids.iter()
                        .enumerate()
                        .filter(|(_, (_, mask))| mask.is_valid(row, col))
                        .filter_map(|(position, (band, _))| {
                            band.sample(row, col).map(|value| Candidate { position, value })
                        })
                        .reduce(Candidate::merge)
                        .map(|c| c.position)
                })
                .collect::<Vec<_>>()
        })?
        .into_iter()
        .flatten()
        .collect();

    Array2::from_shape_vec((rows, cols), winners).map_err(|e| Error::Other(e.to_string()))
}

/// Build the quality mosaic of `sequence`, maximizing band `selection`.
///
/// The composite has the band order and geotransform of the first image.
/// Its mask is `true` exactly where some image won the pixel; elsewhere
/// every band is `None`.
pub fn quality_mosaic(
    sequence: &ImageSequence,
    selection: &str,
    mode: ProcessingMode,
) -> Result<Raster> {
    let winners = select_winners(sequence, selection, mode)?;
    mosaic_from_winners(sequence, &winners, mode)
}

/// Assemble a composite from a precomputed winner grid
pub fn mosaic_from_winners(
    sequence: &ImageSequence,
    winners: &Array2<Option<usize>>,
    mode: ProcessingMode,
) -> Result<Raster> {
    if winners.dim() != sequence.shape() {
        return Err(Error::ShapeMismatch {
            image: None,
            band: None,
            expected: sequence.shape(),
            found: winners.dim(),
        });
    }
    if let Some(bad) = winners.iter().flatten().find(|&&p| p >= sequence.len()) {
        return Err(Error::InvalidParameter {
            name: "winners",
            value: bad.to_string(),
            reason: format!("sequence has {} images", sequence.len()),
        });
    }

    let first = sequence.first();
    let names: Vec<&str> = first.band_names();

    let bands: Vec<Band> = mode.try_map(0..names.len(), |i| {
        let name = names[i];
        let sources: Vec<&Band> = sequence
            .iter()
            .enumerate()
            .map(|(image, img)| {
                img.band(name).ok_or_else(|| Error::MissingBand {
                    image: Some(image),
                    band: name.to_string(),
                })
            })
            .collect::<Result<_>>()?;

        let samples: Array2<Sample> = Array2::from_shape_fn(winners.dim(), |(row, col)| {
            winners[(row, col)].and_then(|w| sources[w].sample(row, col))
        });
        Ok(Band::new(name, samples))
    })?;

    let mask = ValidityMask::from_array(winners.mapv(|w| w.is_some()));
    Ok(Raster::new(bands, mask)?.with_transform(*first.transform()))
}
