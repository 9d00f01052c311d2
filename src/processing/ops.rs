// src/processing/ops.rs
//! Pixel kernels behind the image graph.
//!
//! Every kernel propagates masks: a pixel masked in any input is masked in
//! the output.

use rayon::prelude::*;

use super::raster::Band;
use crate::error::{FloodError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Eq,
}

impl CompareOp {
    fn apply(self, a: f32, b: f32) -> bool {
        match self {
            CompareOp::Gt => a > b,
            CompareOp::Lt => a < b,
            CompareOp::Eq => a == b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
}

fn check_same_len(a: &Band, b: &Band) -> Result<()> {
    if a.len() != b.len() {
        return Err(FloodError::GridMismatch(format!(
            "{} has {} pixels, {} has {}",
            a.name(),
            a.len(),
            b.name(),
            b.len()
        )));
    }
    Ok(())
}

fn build(name: &str, like: &Band, pixels: (Vec<f32>, Vec<bool>)) -> Band {
    let (width, height) = like.shape();
    Band::new(name, width, height, pixels.0, pixels.1)
}

/// `(a - b) / (a + b)`. A negative input or a zero denominator is nodata,
/// which keeps every valid output in [-1, 1].
pub fn normalized_difference(a: &Band, b: &Band, name: &str) -> Result<Band> {
    check_same_len(a, b)?;
    let (av, bv) = (a.values(), b.values());
    let (am, bm) = (a.mask(), b.mask());

    let pixels: (Vec<f32>, Vec<bool>) = (0..a.len())
        .into_par_iter()
        .map(|i| {
            let sum = av[i] + bv[i];
            if !am[i] || !bm[i] || av[i] < 0.0 || bv[i] < 0.0 || sum == 0.0 {
                (0.0, false)
            } else {
                ((av[i] - bv[i]) / sum, true)
            }
        })
        .unzip();

    Ok(build(name, a, pixels))
}

/// 1.0 where the comparison holds, 0.0 elsewhere
pub fn compare(band: &Band, op: CompareOp, value: f32) -> Band {
    let (v, m) = (band.values(), band.mask());
    let pixels: (Vec<f32>, Vec<bool>) = (0..band.len())
        .into_par_iter()
        .map(|i| {
            if m[i] {
                (if op.apply(v[i], value) { 1.0 } else { 0.0 }, true)
            } else {
                (0.0, false)
            }
        })
        .unzip();
    build(band.name(), band, pixels)
}

pub fn binary(a: &Band, b: &Band, op: BinaryOp) -> Result<Band> {
    check_same_len(a, b)?;
    let (av, bv) = (a.values(), b.values());
    let (am, bm) = (a.mask(), b.mask());

    let pixels: (Vec<f32>, Vec<bool>) = (0..a.len())
        .into_par_iter()
        .map(|i| {
            if !am[i] || !bm[i] {
                return (0.0, false);
            }
            let value = match op {
                BinaryOp::Add => av[i] + bv[i],
                BinaryOp::Subtract => av[i] - bv[i],
            };
            (value, true)
        })
        .unzip();

    Ok(build(a.name(), a, pixels))
}

/// Map each value in `from` to the matching entry of `to`; values not listed
/// in `from` become nodata.
pub fn remap(band: &Band, from: &[f32], to: &[f32]) -> Result<Band> {
    if from.len() != to.len() {
        return Err(FloodError::InvalidConfig(format!(
            "remap lists differ in length: {} vs {}",
            from.len(),
            to.len()
        )));
    }
    let (v, m) = (band.values(), band.mask());
    let pixels: (Vec<f32>, Vec<bool>) = (0..band.len())
        .into_par_iter()
        .map(|i| {
            if !m[i] {
                return (0.0, false);
            }
            match from.iter().position(|&f| f == v[i]) {
                Some(pos) => (to[pos], true),
                None => (0.0, false),
            }
        })
        .unzip();
    Ok(build(band.name(), band, pixels))
}

/// Keep pixels where `mask` is valid and non-zero
pub fn update_mask(band: &Band, mask: &Band) -> Result<Band> {
    check_same_len(band, mask)?;
    let keep: Vec<bool> = mask
        .values()
        .iter()
        .zip(mask.mask())
        .map(|(&value, &valid)| valid && value != 0.0)
        .collect();
    Ok(apply_mask(band, &keep))
}

/// AND an externally computed pixel mask into a band
pub fn apply_mask(band: &Band, keep: &[bool]) -> Band {
    let mask = band
        .mask()
        .par_iter()
        .zip(keep.par_iter())
        .map(|(&valid, &keep)| valid && keep)
        .collect();
    let (width, height) = band.shape();
    Band::new(band.name(), width, height, band.values().to_vec(), mask)
}

/// Running per-pixel sum and count of valid samples, for compositing a
/// temporal stack one band at a time.
#[derive(Debug, Clone)]
pub struct MeanAccumulator {
    width: usize,
    height: usize,
    sum: Vec<f64>,
    count: Vec<u32>,
}

impl MeanAccumulator {
    pub fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            sum: vec![0.0; len],
            count: vec![0; len],
        }
    }

    pub fn add(&mut self, band: &Band) -> Result<()> {
        let len = self.sum.len();
        if band.len() != len {
            return Err(FloodError::GridMismatch(format!(
                "{} has {} pixels, expected {}",
                band.name(),
                band.len(),
                len
            )));
        }
        let (v, m) = (band.values(), band.mask());
        self.sum
            .par_iter_mut()
            .zip(self.count.par_iter_mut())
            .enumerate()
            .for_each(|(i, (sum, count))| {
                if m[i] {
                    *sum += v[i] as f64;
                    *count += 1;
                }
            });
        Ok(())
    }

    /// The mean band; pixels with no valid sample are nodata.
    pub fn finish(self, name: &str) -> Band {
        let pixels: (Vec<f32>, Vec<bool>) = self
            .sum
            .par_iter()
            .zip(self.count.par_iter())
            .map(|(&sum, &count)| {
                if count == 0 {
                    (0.0, false)
                } else {
                    ((sum / count as f64) as f32, true)
                }
            })
            .unzip();
        Band::new(name, self.width, self.height, pixels.0, pixels.1)
    }
}

/// Per-pixel mean over the valid samples of a temporal stack.
///
/// A pixel with no valid sample in any layer is nodata.
pub fn mean(stack: &[&Band], name: &str, width: usize, height: usize) -> Result<Band> {
    let mut acc = MeanAccumulator::new(width, height);
    for band in stack {
        acc.add(band)?;
    }
    Ok(acc.finish(name))
}
