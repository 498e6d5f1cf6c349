//! Render tuning
//!
//! The pipeline shape is fixed; only the constants live here. [`RenderPreset::Lab`]
//! is the canonical set and the [`Default`] of [`RenderConfig`].

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Orientation, Rgb};
use crate::error::Error;

/// Separable smoothing applied to both signals before resampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    /// Kernel weights; normalized to sum 1 when applied
    pub kernel: Vec<f32>,
    /// Number of times the kernel is applied
    pub passes: u32,
}

impl Smoothing {
    /// No smoothing
    pub fn none() -> Self {
        Self {
            kernel: vec![1.0],
            passes: 0,
        }
    }

    /// Kernel scaled so its weights sum to 1
    pub fn normalized_kernel(&self) -> Vec<f32> {
        let sum: f32 = self.kernel.iter().sum();
        if sum == 0.0 {
            return self.kernel.clone();
        }
        self.kernel.iter().map(|w| w / sum).collect()
    }
}

/// Intensity blend: `clip(base + gain * (page * p + bitline * b), 0, 1)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// Offset added before clipping
    pub base: f32,
    /// Scale of the weighted sum
    pub gain: f32,
    /// Weight of the per-page signal
    pub page: f32,
    /// Weight of the per-bitline signal
    pub bitline: f32,
}

impl BlendWeights {
    /// Blend two signal samples into an intensity in 0..=1
    #[inline]
    pub fn intensity(&self, page: f32, bitline: f32) -> f32 {
        (self.base + self.gain * (self.page * page + self.bitline * bitline)).clamp(0.0, 1.0)
    }
}

/// Alternating brightness bands along the page axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Number of bands across the axis; the band width is `len / divisions`
    pub divisions: u32,
    /// Extra brightness of odd bands
    pub amplitude: f32,
    /// Brightness factor of even bands
    pub floor: f32,
}

impl StripeConfig {
    /// Brightness factor at position `pos` of an axis `len` pixels long
    #[inline]
    pub fn factor(&self, pos: usize, len: usize) -> f32 {
        let period = (len / self.divisions.max(1) as usize).max(1);
        if (pos / period) % 2 == 1 {
            self.floor + self.amplitude
        } else {
            self.floor
        }
    }
}

/// Blend and stripes for one orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisProfile {
    /// Intensity blend
    pub blend: BlendWeights,
    /// Separator stripes
    pub stripes: StripeConfig,
}

/// Anchor colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// All bits set
    pub erased: Rgb,
    /// Bits cleared
    pub programmed: Rgb,
    /// Background of check-bit zeros and periphery
    pub unset: Rgb,
}

/// Full render configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Signal smoothing
    pub smoothing: Smoothing,
    /// Pages along x
    pub horizontal: AxisProfile,
    /// Pages along y
    pub vertical: AxisProfile,
    /// Colors
    pub palette: Palette,
}

impl RenderConfig {
    /// Profile used for `orientation`
    pub fn profile(&self, orientation: Orientation) -> &AxisProfile {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderPreset::Lab.config()
    }
}

const LAB_PALETTE: Palette = Palette {
    erased: Rgb::new(35, 170, 70),
    programmed: Rgb::new(230, 220, 70),
    unset: Rgb::new(20, 60, 30),
};

/// Named constant sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPreset {
    /// Smoothed, striped, resembling a stained die capture
    #[default]
    Lab,
    /// Raw signals, equal weights, no stripes
    Flat,
}

impl RenderPreset {
    /// Configuration of this preset
    pub fn config(self) -> RenderConfig {
        match self {
            RenderPreset::Lab => RenderConfig {
                smoothing: Smoothing {
                    kernel: vec![1.0, 2.0, 3.0, 2.0, 1.0],
                    passes: 2,
                },
                horizontal: AxisProfile {
                    blend: BlendWeights {
                        base: 0.20,
                        gain: 0.80,
                        page: 0.30,
                        bitline: 0.70,
                    },
                    stripes: StripeConfig {
                        divisions: 64,
                        amplitude: 0.06,
                        floor: 0.94,
                    },
                },
                vertical: AxisProfile {
                    blend: BlendWeights {
                        base: 0.18,
                        gain: 0.82,
                        page: 0.55,
                        bitline: 0.45,
                    },
                    stripes: StripeConfig {
                        divisions: 16,
                        amplitude: 0.08,
                        floor: 0.94,
                    },
                },
                palette: LAB_PALETTE,
            },
            RenderPreset::Flat => {
                let profile = AxisProfile {
                    blend: BlendWeights {
                        base: 0.0,
                        gain: 1.0,
                        page: 0.5,
                        bitline: 0.5,
                    },
                    stripes: StripeConfig {
                        divisions: 1,
                        amplitude: 0.0,
                        floor: 1.0,
                    },
                };
                RenderConfig {
                    smoothing: Smoothing::none(),
                    horizontal: profile,
                    vertical: profile,
                    palette: LAB_PALETTE,
                }
            }
        }
    }
}

impl FromStr for RenderPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lab" => Ok(RenderPreset::Lab),
            "flat" => Ok(RenderPreset::Flat),
            _ => Err(Error::InvalidRenderPreset),
        }
    }
}

impl fmt::Display for RenderPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderPreset::Lab => write!(f, "lab"),
            RenderPreset::Flat => write!(f, "flat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_normalized() {
        let k = RenderPreset::Lab.config().smoothing.normalized_kernel();
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!((k[2] - 3.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_stripe_factor() {
        let s = RenderPreset::Lab.config().horizontal.stripes;
        // 128 px wide: bands of 2 px
        assert_eq!(s.factor(0, 128), 0.94);
        assert_eq!(s.factor(1, 128), 0.94);
        assert_eq!(s.factor(2, 128), 0.94 + 0.06);
        // narrower than the division count: 1 px bands
        assert_eq!(s.factor(1, 48), 0.94 + 0.06);
    }

    #[test]
    fn test_intensity_clipped() {
        let b = RenderPreset::Lab.config().horizontal.blend;
        assert!((b.intensity(0.0, 0.0) - 0.20).abs() < 1e-6);
        assert_eq!(b.intensity(1.0, 2.0), 1.0);
        let wild = BlendWeights {
            base: -1.0,
            ..b
        };
        assert_eq!(wild.intensity(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("LAB".parse::<RenderPreset>().unwrap(), RenderPreset::Lab);
        assert_eq!("flat".parse::<RenderPreset>().unwrap(), RenderPreset::Flat);
        assert_eq!("noir".parse::<RenderPreset>(), Err(Error::InvalidRenderPreset));
        assert_eq!(RenderConfig::default(), RenderPreset::Lab.config());
    }

    #[test]
    fn test_profile_selection() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.profile(Orientation::Vertical).stripes.divisions, 16);
        assert_eq!(cfg.profile(Orientation::Horizontal).stripes.divisions, 64);
    }
}
