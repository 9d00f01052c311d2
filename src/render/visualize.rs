// src/render/visualize.rs
//! Stretch / gamma / palette rendering of images to 8-bit RGB.

use itertools::izip;
use rayon::prelude::*;

use crate::config::{GREEN_BAND, NIR_BAND, SWIR_BAND};
use crate::error::{FloodError, Result};
use crate::processing::{Band, Raster};

pub const VIS_BANDS: [&str; 3] = ["vis-red", "vis-green", "vis-blue"];

/// RGB color with values in 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a CSS color name or `RRGGBB` / `#RRGGBB` hex
    pub fn parse(s: &str) -> Result<Self> {
        let named = match s.to_ascii_lowercase().as_str() {
            "black" => Some(Self::new(0, 0, 0)),
            "white" => Some(Self::new(255, 255, 255)),
            "red" => Some(Self::new(255, 0, 0)),
            "green" => Some(Self::new(0, 128, 0)),
            "lime" => Some(Self::new(0, 255, 0)),
            "blue" => Some(Self::new(0, 0, 255)),
            "navy" => Some(Self::new(0, 0, 128)),
            "cyan" | "aqua" => Some(Self::new(0, 255, 255)),
            "magenta" | "fuchsia" => Some(Self::new(255, 0, 255)),
            "yellow" => Some(Self::new(255, 255, 0)),
            "orange" => Some(Self::new(255, 165, 0)),
            "purple" => Some(Self::new(128, 0, 128)),
            "gray" | "grey" => Some(Self::new(128, 128, 128)),
            _ => None,
        };
        if let Some(color) = named {
            return Ok(color);
        }

        let hex = s.trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        if hex.len() == 6 && hex.is_ascii() {
            if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
                return Ok(Self::new(r, g, b));
            }
        }
        Err(FloodError::InvalidVisualization(format!("unknown color '{}'", s)))
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Visualization parameters: band selection, linear stretch, gamma and
/// an optional palette for single-band images.
#[derive(Debug, Clone, PartialEq)]
pub struct VisParams {
    /// Bands to render; all bands of the image when empty
    pub bands: Vec<String>,
    pub min: f64,
    pub max: f64,
    pub gamma: f64,
    pub palette: Vec<Rgb>,
}

impl Default for VisParams {
    fn default() -> Self {
        Self {
            bands: Vec::new(),
            min: 0.0,
            max: 1.0,
            gamma: 1.0,
            palette: Vec::new(),
        }
    }
}

impl VisParams {
    /// SWIR / NIR / green false color, stretched 0..3000 with gamma 1.4
    pub fn false_color() -> Self {
        Self {
            bands: vec![SWIR_BAND.to_string(), NIR_BAND.to_string(), GREEN_BAND.to_string()],
            min: 0.0,
            max: 3000.0,
            gamma: 1.4,
            palette: Vec::new(),
        }
    }

    /// Single-band palette rendering over the default 0..1 range
    pub fn palette(colors: &[&str]) -> Result<Self> {
        let palette = colors.iter().map(|c| Rgb::parse(c)).collect::<Result<Vec<_>>>()?;
        if palette.is_empty() {
            return Err(FloodError::InvalidVisualization("empty palette".to_string()));
        }
        Ok(Self {
            palette,
            ..Self::default()
        })
    }

    fn stretch(&self, value: f32) -> f64 {
        let range = self.max - self.min;
        let t = if range.abs() > f64::EPSILON {
            (value as f64 - self.min) / range
        } else {
            0.0
        };
        t.clamp(0.0, 1.0)
    }

    fn palette_color(&self, t: f64) -> Rgb {
        match self.palette.len() {
            0 => Rgb::new(0, 0, 0),
            1 => self.palette[0],
            n => {
                let pos = t * (n - 1) as f64;
                let lo = (pos.floor() as usize).min(n - 2);
                self.palette[lo].lerp(self.palette[lo + 1], pos - lo as f64)
            }
        }
    }
}

/// Render an image to three 0..255 bands named [`VIS_BANDS`].
///
/// Masks carry through: a pixel is valid only when every rendered input
/// band is valid there.
pub fn visualize(image: &Raster, params: &VisParams) -> Result<Raster> {
    if params.gamma <= 0.0 {
        return Err(FloodError::InvalidVisualization(format!("gamma {} must be positive", params.gamma)));
    }
    let inputs: Vec<&Band> = if params.bands.is_empty() {
        image.bands().iter().collect()
    } else {
        params.bands.iter().map(|b| image.band(b)).collect::<Result<_>>()?
    };

    let geo = image.geo();
    let (width, height) = (geo.width, geo.height);

    let channels: [Vec<f32>; 3] = match (inputs.len(), params.palette.is_empty()) {
        (1, false) => {
            let band = inputs[0];
            let colors: Vec<Rgb> = band
                .values()
                .par_iter()
                .map(|&v| params.palette_color(params.stretch(v)))
                .collect();
            [
                colors.iter().map(|c| c.r as f32).collect(),
                colors.iter().map(|c| c.g as f32).collect(),
                colors.iter().map(|c| c.b as f32).collect(),
            ]
        }
        (_, false) => {
            return Err(FloodError::InvalidVisualization(format!(
                "palette needs exactly one band, got {}",
                inputs.len()
            )))
        }
        (1, true) => {
            let gray = stretch_channel(inputs[0], params);
            [gray.clone(), gray.clone(), gray]
        }
        (3, true) => [
            stretch_channel(inputs[0], params),
            stretch_channel(inputs[1], params),
            stretch_channel(inputs[2], params),
        ],
        (n, true) => {
            return Err(FloodError::InvalidVisualization(format!(
                "need 1 or 3 bands to visualize, got {}",
                n
            )))
        }
    };

    let mask: Vec<bool> = (0..geo.pixel_count())
        .map(|i| inputs.iter().all(|b| b.mask()[i]))
        .collect();

    let bands = izip!(VIS_BANDS.iter(), channels)
        .map(|(name, values)| Band::new(name, width, height, values, mask.clone()))
        .collect();
    Raster::new(geo.clone(), bands)
}

fn stretch_channel(band: &Band, params: &VisParams) -> Vec<f32> {
    let inv_gamma = 1.0 / params.gamma;
    band.values()
        .par_iter()
        .map(|&v| (params.stretch(v).powf(inv_gamma) * 255.0).round() as f32)
        .collect()
}
