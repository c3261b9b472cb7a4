//! Single-band GeoTIFF reading and writing
//!
//! Uses the `tiff` crate. Only north-up grids described by the
//! ModelTiepoint + ModelPixelScale tags are georeferenced; other files load
//! with the default transform.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{Error, Result};
use crate::raster::{Band, GeoTransform, Raster};

/// Read a single-band GeoTIFF file as a named band.
///
/// Samples equal to the file's GDAL no-data value, NaN or infinite become
/// `None`.
pub fn read_band<P: AsRef<Path>>(path: P, name: &str) -> Result<(Band, GeoTransform)> {
    let file = File::open(path.as_ref())?;
    decode_band(file, name)
}

/// Same as [`read_band`] from an in-memory buffer
pub fn read_band_from_buffer(data: &[u8], name: &str) -> Result<(Band, GeoTransform)> {
    decode_band(Cursor::new(data), name)
}

fn decode_band<R: Read + Seek>(reader: R, name: &str) -> Result<(Band, GeoTransform)> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);

    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_end_matches('\0').trim().parse::<f64>().ok());
    let transform = read_geotransform(&mut decoder).unwrap_or_default();

    let values: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => buf,
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if values.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected a single-band image of {} samples, got {}",
            rows * cols,
            values.len()
        )));
    }

    let array = Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| Error::Other(e.to_string()))?;
    let samples = array.mapv(|v| match nodata {
        Some(nd) if v == nd => None,
        _ => Some(v),
    });

    Ok((Band::new(name, samples), transform))
}

fn cast_all<T: num_traits::NumCast + Copy>(buf: &[T]) -> Vec<f64> {
    buf.iter()
        .map(|&v| num_traits::cast::<T, f64>(v).unwrap_or(f64::NAN))
        .collect()
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    GeoTransform::from_tiepoint(&tiepoint, &scale)
}

/// Write one band of a raster as a Float32 GeoTIFF file.
///
/// Masked-out pixels and `None` samples are written as NaN and the GDAL
/// no-data tag is set to `nan`.
pub fn write_band<P: AsRef<Path>>(raster: &Raster, band: &str, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_band(raster, band, file)
}

/// Same as [`write_band`] into an in-memory buffer
pub fn write_band_to_buffer(raster: &Raster, band: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_band(raster, band, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_band<W: Write + Seek>(raster: &Raster, band: &str, writer: W) -> Result<()> {
    let source = raster.require_band(band)?;
    let mask = raster.mask();
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = source
        .view()
        .indexed_iter()
        .map(|((row, col), sample)| match sample {
            Some(v) if mask.is_valid(row, col) => *v as f32,
            _ => f32::NAN,
        })
        .collect();

    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;

    let gt = raster.transform();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &gt.pixel_scale()[..])?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &gt.tiepoint()[..])?;

    // Version 1.1.0 with two keys: GTModelTypeGeoKey = Projected,
    // GTRasterTypeGeoKey = PixelIsArea
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
    image.encoder().write_tag(Tag::GdalNodata, "nan")?;

    image.write_data(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::ValidityMask;

    #[test]
    fn test_buffer_roundtrip_keeps_values_and_nodata() {
        let band = Band::from_vec("NDVI", vec![0.5, f64::NAN, -0.25, 0.75], 2, 2).unwrap();
        let mask = ValidityMask::from_vec(vec![true, true, true, false], 2, 2).unwrap();
        let raster = Raster::new(vec![band], mask)
            .unwrap()
            .with_transform(GeoTransform::new(100.0, 200.0, 30.0, -30.0));

        let bytes = write_band_to_buffer(&raster, "NDVI").unwrap();
        let (back, transform) = read_band_from_buffer(&bytes, "ndvi").unwrap();

        assert_eq!(back.name(), "ndvi");
        assert_eq!(back.shape(), (2, 2));
        assert_eq!(back.sample(0, 0), Some(0.5));
        assert_eq!(back.sample(0, 1), None);
        assert_eq!(back.sample(1, 0), Some(-0.25));
        // Masked pixel is written as no-data
        assert_eq!(back.sample(1, 1), None);
        assert_eq!(transform, GeoTransform::new(100.0, 200.0, 30.0, -30.0));
    }

    #[test]
    fn test_write_missing_band() {
        let raster = Raster::from_bands(vec![Band::filled("B4", 1, 1, 0.1)]).unwrap();
        assert!(matches!(
            write_band_to_buffer(&raster, "B5"),
            Err(Error::MissingBand { .. })
        ));
    }

    #[test]
    fn test_read_integer_samples() {
        use tiff::encoder::colortype::Gray16;

        let mut bytes = Cursor::new(Vec::new());
        TiffEncoder::new(&mut bytes)
            .unwrap()
            .write_image::<Gray16>(3, 1, &[0u16, 1200, 65535])
            .unwrap();

        let (band, transform) = read_band_from_buffer(bytes.get_ref(), "B5").unwrap();
        assert_eq!(band.shape(), (1, 3));
        assert_eq!(band.sample(0, 0), Some(0.0));
        assert_eq!(band.sample(0, 1), Some(1200.0));
        assert_eq!(band.sample(0, 2), Some(65535.0));
        assert_eq!(transform, GeoTransform::default());
    }

    #[test]
    fn test_read_garbage_fails() {
        assert!(read_band_from_buffer(b"not a tiff", "x").is_err());
    }
}
