// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! 64-bit perceptual hash (pHash) of preview images.
//!
//! The image is reduced to 32x32 luma with a Lanczos filter, transformed with
//! a 2-D DCT-II, and the top-left 8x8 low-frequency block is thresholded
//! against its median. Bits are packed row-major, most significant first,
//! and rendered as 16 lowercase hex digits.

use std::f64::consts::PI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};

use framegrid_core::GridError;

const SIDE: usize = 32;
const LOW: usize = 8;

/// A 64-bit perceptual hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerceptualHash(pub u64);

impl PerceptualHash {
    /// Number of differing bits between two hashes.
    pub fn distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for PerceptualHash {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(GridError::media(format!(
                "perceptual hash must be 16 hex digits, got {s:?}"
            )));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| GridError::media(format!("invalid perceptual hash {s:?}")))
    }
}

/// Hamming distance between two hex-encoded hashes.
pub fn hamming(a: &str, b: &str) -> Result<u32, GridError> {
    Ok(a.parse::<PerceptualHash>()?.distance(b.parse()?))
}

/// ITU-R 601 luma with the same fixed-point rounding as common imaging
/// libraries, so hashes agree with fingerprints produced elsewhere.
fn to_luma(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let l = (u32::from(p[0]) * 19595 + u32::from(p[1]) * 38470 + u32::from(p[2]) * 7471
            + 0x8000)
            >> 16;
        Luma([l as u8])
    })
}

/// Unnormalised DCT-II of one row.
fn dct_1d(input: &[f64]) -> Vec<f64> {
    let n = input.len() as f64;
    (0..input.len())
        .map(|k| {
            2.0 * input
                .iter()
                .enumerate()
                .map(|(i, x)| x * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .sum::<f64>()
        })
        .collect()
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Stateless pHash calculator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentFingerprinter;

impl ContentFingerprinter {
    pub fn new() -> Self {
        Self
    }

    /// Hashes an in-memory image.
    pub fn fingerprint_image(&self, image: &DynamicImage) -> PerceptualHash {
        let small = image.resize_exact(SIDE as u32, SIDE as u32, FilterType::Lanczos3);
        let luma = to_luma(&small);

        let rows: Vec<Vec<f64>> = (0..SIDE)
            .map(|y| {
                let row: Vec<f64> = (0..SIDE)
                    .map(|x| f64::from(luma.get_pixel(x as u32, y as u32)[0]))
                    .collect();
                dct_1d(&row)
            })
            .collect();
        // Column pass only needs the first LOW rows of output.
        let mut low = Vec::with_capacity(LOW * LOW);
        let columns: Vec<Vec<f64>> = (0..LOW)
            .map(|x| {
                let column: Vec<f64> = rows.iter().map(|r| r[x]).collect();
                dct_1d(&column)
            })
            .collect();
        for y in 0..LOW {
            for column in &columns {
                low.push(column[y]);
            }
        }

        let threshold = median(&low);
        let bits = low
            .iter()
            .fold(0u64, |acc, v| (acc << 1) | u64::from(*v > threshold));
        PerceptualHash(bits)
    }

    /// Hashes the image at `path` on a blocking thread.
    pub async fn fingerprint_file(&self, path: &Path) -> Result<PerceptualHash, GridError> {
        let owned = path.to_path_buf();
        let this = *self;
        tokio::task::spawn_blocking(move || {
            image::open(&owned)
                .map(|img| this.fingerprint_image(&img))
                .map_err(|e| GridError::Media {
                    message: format!("cannot fingerprint {}", owned.display()),
                    source: Some(Box::new(e)),
                })
        })
        .await
        .map_err(|e| GridError::Internal(format!("fingerprint task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    /// Diagonal ramp with a bright top-left block, so the low-frequency
    /// coefficients vary along both axes.
    fn pattern(width: u32, height: u32, invert: bool) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let ramp = (x * 2 * height + y * width) * 160 / (3 * width * height);
            let block = if x < width / 3 && y < height / 2 { 90 } else { 0 };
            let v = (ramp + block).min(255) as u8;
            let v = if invert { 255 - v } else { v };
            Rgb([v, v, v])
        }))
    }

    #[test]
    fn hash_renders_as_sixteen_hex_digits() {
        let h = PerceptualHash(0xab);
        assert_eq!(h.to_string(), "00000000000000ab");
        assert_eq!("00000000000000ab".parse::<PerceptualHash>().unwrap(), h);
    }

    #[test]
    fn malformed_hashes_are_rejected() {
        assert!("abc".parse::<PerceptualHash>().is_err());
        assert!("zzzzzzzzzzzzzzzz".parse::<PerceptualHash>().is_err());
    }

    #[test]
    fn hamming_counts_differing_bits() {
        assert_eq!(hamming("0000000000000000", "0000000000000000").unwrap(), 0);
        assert_eq!(hamming("0000000000000000", "000000000000000f").unwrap(), 4);
        assert_eq!(hamming("ffffffffffffffff", "0000000000000000").unwrap(), 64);
        assert!(hamming("nothex", "0000000000000000").is_err());
    }

    #[test]
    fn identical_images_hash_identically() {
        let fp = ContentFingerprinter::new();
        let a = fp.fingerprint_image(&pattern(120, 80, false));
        let b = fp.fingerprint_image(&pattern(120, 80, false));
        assert_eq!(a, b);
    }

    #[test]
    fn rescaled_image_stays_close() {
        let fp = ContentFingerprinter::new();
        let a = fp.fingerprint_image(&pattern(320, 180, false));
        let b = fp.fingerprint_image(&pattern(160, 90, false));
        assert!(a.distance(b) <= 10, "distance {}", a.distance(b));
    }

    #[test]
    fn inverted_image_is_far_apart() {
        let fp = ContentFingerprinter::new();
        let a = fp.fingerprint_image(&pattern(128, 128, false));
        let b = fp.fingerprint_image(&pattern(128, 128, true));
        assert!(a.distance(b) > 16, "distance {}", a.distance(b));
    }

    #[test]
    fn dct_of_constant_row_has_only_dc() {
        let out = dct_1d(&[1.0; 8]);
        assert!((out[0] - 16.0).abs() < 1e-9);
        assert!(out[1..].iter().all(|v| v.abs() < 1e-9));
    }

    #[tokio::test]
    async fn fingerprints_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        pattern(64, 64, false).save(&path).unwrap();
        let fp = ContentFingerprinter::new();
        let from_disk = fp.fingerprint_file(&path).await.unwrap();
        assert_eq!(from_disk, fp.fingerprint_image(&pattern(64, 64, false)));
        assert!(fp.fingerprint_file(&dir.path().join("missing.png")).await.is_err());
    }
}
