// src/io/writer.rs
use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{Dataset, DriverManager, Metadata};
use std::path::Path;

use super::reader::GeoInfo;
use crate::error::{FloodError, Result};
use crate::processing::{Band, Raster};
use crate::utils::fixed_point::{to_fixed_point, to_float_nodata, NODATA_VALUE_FLOAT, NODATA_VALUE_INT};

pub const NODATA_VALUE_BYTE: u8 = 255;

/// GeoTIFF creation settings
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub compress: String,
    pub compress_level: u8,
    pub tiled: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            compress: "DEFLATE".to_string(),
            compress_level: 6,
            tiled: true,
        }
    }
}

impl OutputOptions {
    fn option_strings(&self, extra: &[&str]) -> Vec<String> {
        let mut options = Vec::new();
        let compress = self.compress.to_uppercase();

        // Add compression if not NONE
        if compress != "NONE" {
            options.push(format!("COMPRESS={}", compress));

            // Add compression level for supported algorithms
            match compress.as_str() {
                "DEFLATE" => options.push(format!("ZLEVEL={}", self.compress_level.min(9))),
                "ZSTD" => options.push(format!("ZSTD_LEVEL={}", self.compress_level.min(22))),
                _ => {}
            }
        }

        if self.tiled {
            options.push("TILED=YES".to_string());
        }
        options.push("NUM_THREADS=ALL_CPUS".to_string());
        options.extend(extra.iter().map(|s| s.to_string()));
        options
    }

    fn creation_options(&self, extra: &[&str]) -> RasterCreationOptions {
        RasterCreationOptions::from_iter(self.option_strings(extra))
    }
}

/// Sample encoding of a single-band output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// float32, nodata -999
    Float32,
    /// int16 scaled by `scale_factor`, nodata -10000
    FixedPoint { scale_factor: i32 },
    /// uint8 class values, nodata 255
    Byte,
}

fn check_writable(geo: &GeoInfo, path: &Path) -> Result<()> {
    if geo.width == 0 || geo.height == 0 {
        return Err(FloodError::GridMismatch(format!(
            "cannot write empty {}x{} raster to {}",
            geo.width,
            geo.height,
            path.display()
        )));
    }
    Ok(())
}

fn set_georeference(dataset: &mut Dataset, geo: &GeoInfo) -> Result<()> {
    if !geo.projection.is_empty() {
        dataset.set_projection(&geo.projection)?;
    }
    dataset.set_geo_transform(&geo.geo_transform)?;
    Ok(())
}

/// Write one band as a GeoTIFF; masked pixels get the encoding's nodata value.
pub fn write_band(band: &Band, geo: &GeoInfo, path: &Path, encoding: Encoding, options: &OutputOptions) -> Result<()> {
    check_writable(geo, path)?;
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let creation_options = options.creation_options(&[]);
    let size = (geo.width, geo.height);

    match encoding {
        Encoding::Float32 => {
            let mut out_ds = driver.create_with_band_type_with_options::<f32, _>(
                path,
                geo.width,
                geo.height,
                1,
                &creation_options,
            )?;
            set_georeference(&mut out_ds, geo)?;

            let mut out_band = out_ds.rasterband(1)?;
            out_band.set_no_data_value(Some(NODATA_VALUE_FLOAT as f64))?;
            out_band.set_description(band.name())?;

            let mut buffer = Buffer::new(size, to_float_nodata(band.values(), band.mask()));
            out_band.write((0, 0), size, &mut buffer)?;
            out_ds.flush_cache()?;
        }
        Encoding::FixedPoint { scale_factor } => {
            let mut out_ds = driver.create_with_band_type_with_options::<i16, _>(
                path,
                geo.width,
                geo.height,
                1,
                &creation_options,
            )?;
            set_georeference(&mut out_ds, geo)?;

            let mut out_band = out_ds.rasterband(1)?;
            out_band.set_no_data_value(Some(NODATA_VALUE_INT as f64))?;
            out_band.set_metadata_item("SCALE", &format!("{}", 1.0 / scale_factor as f64), "")?;
            out_band.set_metadata_item("OFFSET", "0", "")?;
            out_band.set_description(&format!("{} (scaled by {})", band.name(), scale_factor))?;

            let data = to_fixed_point(band.values(), band.mask(), scale_factor);
            let mut buffer = Buffer::new(size, data);
            out_band.write((0, 0), size, &mut buffer)?;
            out_ds.flush_cache()?;
        }
        Encoding::Byte => {
            let mut out_ds = driver.create_with_band_type_with_options::<u8, _>(
                path,
                geo.width,
                geo.height,
                1,
                &creation_options,
            )?;
            set_georeference(&mut out_ds, geo)?;

            let mut out_band = out_ds.rasterband(1)?;
            out_band.set_no_data_value(Some(NODATA_VALUE_BYTE as f64))?;
            out_band.set_description(band.name())?;

            let data = band
                .values()
                .iter()
                .zip(band.mask())
                .map(|(&v, &valid)| if valid { v.clamp(0.0, 254.0) as u8 } else { NODATA_VALUE_BYTE })
                .collect();
            let mut buffer = Buffer::new(size, data);
            out_band.write((0, 0), size, &mut buffer)?;
            out_ds.flush_cache()?;
        }
    }

    log::info!("Wrote {} to {}", band.name(), path.display());
    Ok(())
}

/// Write a visualized (3-band, 0..255) raster as an RGBA GeoTIFF.
///
/// A pixel is opaque only when all three channels are valid.
pub fn write_rgba(image: &Raster, path: &Path, options: &OutputOptions) -> Result<()> {
    let geo = image.geo();
    check_writable(geo, path)?;
    if image.bands().len() != 3 {
        return Err(FloodError::InvalidVisualization(format!(
            "RGBA output needs 3 visualized bands, got {}",
            image.bands().len()
        )));
    }

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let creation_options = options.creation_options(&["PHOTOMETRIC=RGB", "ALPHA=YES"]);
    let mut out_ds = driver.create_with_band_type_with_options::<u8, _>(
        path,
        geo.width,
        geo.height,
        4,
        &creation_options,
    )?;
    set_georeference(&mut out_ds, geo)?;

    let size = (geo.width, geo.height);
    let alpha: Vec<u8> = (0..geo.pixel_count())
        .map(|i| {
            if image.bands().iter().all(|b| b.mask()[i]) {
                255
            } else {
                0
            }
        })
        .collect();

    for (idx, band) in image.bands().iter().enumerate() {
        let data = band
            .values()
            .iter()
            .zip(&alpha)
            .map(|(&v, &a)| if a == 0 { 0 } else { v.clamp(0.0, 255.0) as u8 })
            .collect();
        let mut out_band = out_ds.rasterband(idx + 1)?;
        let mut buffer = Buffer::new(size, data);
        out_band.write((0, 0), size, &mut buffer)?;
    }
    let mut alpha_band = out_ds.rasterband(4)?;
    let mut buffer = Buffer::new(size, alpha);
    alpha_band.write((0, 0), size, &mut buffer)?;
    out_ds.flush_cache()?;

    log::info!("Wrote RGBA layer to {}", path.display());
    Ok(())
}
