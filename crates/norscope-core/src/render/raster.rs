//! RGB8 image buffer

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Construct from components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear interpolation `self * (1 - t) + other * t`, truncated
    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        let lerp = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t) as u8;
        Rgb::new(
            lerp(self.r, other.r),
            lerp(self.g, other.g),
            lerp(self.b, other.b),
        )
    }

    /// Multiply every component by `factor`, clamped to 0..=255
    pub fn scale(self, factor: f32) -> Rgb {
        let mul = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
        Rgb::new(mul(self.r), mul(self.g), mul(self.b))
    }

    /// Squared euclidean distance, for "closer to" comparisons
    pub fn distance_sq(self, other: Rgb) -> u32 {
        let d = |a: u8, b: u8| {
            let v = a as i32 - b as i32;
            (v * v) as u32
        };
        d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)
    }
}

/// Row-major RGB8 raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Raster {
    /// A raster filled with one color
    pub fn new(width: usize, height: usize, fill: Rgb) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            pixels.extend_from_slice(&[fill.r, fill.g, fill.b]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw RGB bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at `(x, y)`
    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 3;
        Some(Rgb::new(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
        ))
    }

    /// Set pixel at `(x, y)`; out-of-bounds writes are ignored
    pub fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * 3;
        self.pixels[i..i + 3].copy_from_slice(&[color.r, color.g, color.b]);
    }

    /// Place rasters side by side; all must share one height
    pub fn hconcat(parts: &[&Raster]) -> Result<Raster> {
        let height = parts.first().map_or(0, |r| r.height);
        let width: usize = parts.iter().map(|r| r.width).sum();
        if parts.iter().any(|r| r.height != height) {
            return Err(Error::InvalidDimensions { width, height });
        }
        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for part in parts {
                let row = y * part.width * 3;
                pixels.extend_from_slice(&part.pixels[row..row + part.width * 3]);
            }
        }
        Ok(Raster {
            width,
            height,
            pixels,
        })
    }

    /// Stack rasters top to bottom; all must share one width
    pub fn vconcat(parts: &[&Raster]) -> Result<Raster> {
        let width = parts.first().map_or(0, |r| r.width);
        let height: usize = parts.iter().map(|r| r.height).sum();
        if parts.iter().any(|r| r.width != width) {
            return Err(Error::InvalidDimensions { width, height });
        }
        let pixels = parts
            .iter()
            .flat_map(|r| r.pixels.iter().copied())
            .collect();
        Ok(Raster {
            width,
            height,
            pixels,
        })
    }

    /// Binary PPM (P6) encoding
    pub fn to_ppm(&self) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }

    /// Write a binary PPM file
    pub fn write_ppm(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, self.to_ppm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Rgb = Rgb::new(10, 20, 30);
    const B: Rgb = Rgb::new(200, 100, 0);

    #[test]
    fn test_mix_endpoints() {
        assert_eq!(A.mix(B, 0.0), A);
        assert_eq!(A.mix(B, 1.0), B);
        assert_eq!(A.mix(B, 0.5), Rgb::new(105, 60, 15));
    }

    #[test]
    fn test_scale_truncates_and_clamps() {
        assert_eq!(Rgb::new(100, 10, 255).scale(0.94), Rgb::new(94, 9, 239));
        assert_eq!(Rgb::new(250, 0, 0).scale(2.0), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_get_set() {
        let mut r = Raster::new(3, 2, A);
        assert_eq!(r.pixels().len(), 18);
        r.set(2, 1, B);
        assert_eq!(r.get(2, 1), Some(B));
        assert_eq!(r.get(0, 0), Some(A));
        assert_eq!(r.get(3, 0), None);
        r.set(9, 9, B);
    }

    #[test]
    fn test_concat() {
        let left = Raster::new(1, 2, A);
        let right = Raster::new(2, 2, B);
        let joined = Raster::hconcat(&[&left, &right]).unwrap();
        assert_eq!((joined.width(), joined.height()), (3, 2));
        assert_eq!(joined.get(0, 1), Some(A));
        assert_eq!(joined.get(1, 1), Some(B));

        let top = Raster::new(3, 1, A);
        let stacked = Raster::vconcat(&[&top, &joined]).unwrap();
        assert_eq!((stacked.width(), stacked.height()), (3, 3));
        assert_eq!(stacked.get(2, 0), Some(A));
        assert_eq!(stacked.get(2, 2), Some(B));

        assert!(Raster::hconcat(&[&left, &top]).is_err());
        assert!(Raster::vconcat(&[&left, &top]).is_err());
    }

    #[test]
    fn test_ppm_header() {
        let ppm = Raster::new(2, 1, A).to_ppm();
        assert!(ppm.starts_with(b"P6\n2 1\n255\n"));
        assert_eq!(ppm.len(), 11 + 6);
    }
}
