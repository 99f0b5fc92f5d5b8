//! Volume-rendering transfer functions for the normalized outputs.
//!
//! The pipeline stops at normalized volumes; these describe how a renderer is
//! expected to show them. Opacity points are spread evenly over the [0, 1]
//! intensity range.

use serde::{Deserialize, Serialize};

/// Colormap name plus an opacity curve sampled at evenly spaced intensities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub colormap: String,
    pub opacity: Vec<f64>,
}

impl TransferFunction {
    pub fn new(colormap: impl Into<String>, opacity: Vec<f64>) -> Self {
        Self {
            colormap: colormap.into(),
            opacity,
        }
    }

    /// Bone colormap with opacity rising linearly from transparent to opaque.
    pub fn ct() -> Self {
        Self::new("bone", vec![0.0, 1.0])
    }

    /// Inferno colormap, 20 opacity points from 0 to 0.09 so that PET
    /// overlays stay translucent over the CT.
    pub fn pet() -> Self {
        Self::new("inferno", linspace(0.0, 0.09, 20))
    }

    /// Opacity at intensity `value` in [0, 1], linearly interpolated.
    pub fn opacity_at(&self, value: f64) -> f64 {
        match self.opacity.len() {
            0 => 0.0,
            1 => self.opacity[0],
            n => {
                let x = value.clamp(0.0, 1.0) * (n - 1) as f64;
                let lo = x.floor() as usize;
                let hi = (lo + 1).min(n - 1);
                let t = x - lo as f64;
                self.opacity[lo] * (1.0 - t) + self.opacity[hi] * t
            }
        }
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ct_ramp_is_linear() {
        let tf = TransferFunction::ct();
        assert_eq!(tf.colormap, "bone");
        assert!((tf.opacity_at(0.25) - 0.25).abs() < 1e-12);
        assert_eq!(tf.opacity_at(1.5), 1.0);
    }

    #[test]
    fn test_pet_ramp() {
        let tf = TransferFunction::pet();
        assert_eq!(tf.colormap, "inferno");
        assert_eq!(tf.opacity.len(), 20);
        assert_eq!(tf.opacity[0], 0.0);
        assert!((tf.opacity[19] - 0.09).abs() < 1e-12);
        assert!(tf.opacity.windows(2).all(|w| w[1] > w[0]));
    }
}
