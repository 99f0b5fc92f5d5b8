//! Intensity windowing.
//!
//! Two laws map raw intensities to the [0, 1] display range:
//!
//! * [`WindowLevelFilter`]: a fixed center/width window, used for CT with one
//!   of the [`WindowPresets`].
//! * [`AdaptiveWindow`]: a fixed floor and a percentile ceiling followed by a
//!   hard threshold, used for PET so that only hot spots survive.

use std::collections::BTreeMap;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use crate::error::{Result, VivipetError};
use crate::image::{to_voxels, Image, Volume};

/// A linear window given by its center and width.
///
/// Only constructed through [`WindowPreset::new`], so the width is always
/// positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWindowPreset")]
pub struct WindowPreset {
    center: f64,
    width: f64,
}

#[derive(Deserialize)]
struct RawWindowPreset {
    center: f64,
    width: f64,
}

impl TryFrom<RawWindowPreset> for WindowPreset {
    type Error = VivipetError;

    fn try_from(raw: RawWindowPreset) -> Result<Self> {
        Self::new(raw.center, raw.width)
    }
}

impl WindowPreset {
    /// Create a window; the width must be positive and finite.
    pub fn new(center: f64, width: f64) -> Result<Self> {
        if !(width.is_finite() && width > 0.0) || !center.is_finite() {
            return Err(VivipetError::invalid_configuration(format!(
                "window must have a finite center and a positive width, got center={}, width={}",
                center, width
            )));
        }
        Ok(Self { center, width })
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Lowest intensity mapped above 0.
    pub fn lower(&self) -> f64 {
        self.center - self.width / 2.0
    }

    /// Intensity mapped to 1.
    pub fn upper(&self) -> f64 {
        self.center + self.width / 2.0
    }
}

/// Named window presets.
///
/// Built once and handed to whoever needs to resolve a preset name; there is
/// no global table.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPresets {
    presets: BTreeMap<String, WindowPreset>,
}

impl WindowPresets {
    /// The standard CT presets: `soft_tissue` (40, 400), `amide` (450, 1500)
    /// and `animal` (650, 540).
    pub fn standard() -> Self {
        let presets = [
            ("soft_tissue", WindowPreset { center: 40.0, width: 400.0 }),
            ("amide", WindowPreset { center: 450.0, width: 1500.0 }),
            ("animal", WindowPreset { center: 650.0, width: 540.0 }),
        ]
        .into_iter()
        .map(|(name, preset)| (name.to_string(), preset))
        .collect();
        Self { presets }
    }

    /// Add or replace a preset.
    pub fn with_preset(mut self, name: impl Into<String>, preset: WindowPreset) -> Self {
        self.presets.insert(name.into(), preset);
        self
    }

    /// Look up a preset by name.
    ///
    /// # Errors
    /// Returns a configuration error naming the known presets if `name` is unknown.
    pub fn get(&self, name: &str) -> Result<WindowPreset> {
        self.presets.get(name).copied().ok_or_else(|| {
            VivipetError::invalid_configuration(format!(
                "unknown CT window preset '{}' (known: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}

impl Default for WindowPresets {
    fn default() -> Self {
        Self::standard()
    }
}

/// Center/width window-level filter.
///
/// Clips to `[center - width/2, center + width/2]` and rescales linearly to
/// `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct WindowLevelFilter {
    preset: WindowPreset,
}

impl WindowLevelFilter {
    /// Create a filter from a validated preset.
    pub fn new(preset: WindowPreset) -> Self {
        Self { preset }
    }

    /// Resolve `name` in `presets` and build the filter.
    pub fn from_preset(presets: &WindowPresets, name: &str) -> Result<Self> {
        Ok(Self::new(presets.get(name)?))
    }

    /// The window in use.
    pub fn preset(&self) -> WindowPreset {
        self.preset
    }

    /// Apply the filter to an image.
    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Image<B, 3> {
        image.with_data(self.apply_tensor(image.data()))
    }

    /// Apply the filter to a bare volume.
    pub fn apply_tensor<B: Backend>(&self, volume: &Volume<B>) -> Volume<B> {
        let lower = self.preset.lower();
        let upper = self.preset.upper();
        tracing::debug!("Window level: [{}, {}]", lower, upper);

        volume
            .clone()
            .clamp(lower, upper)
            .sub_scalar(lower)
            .div_scalar(self.preset.width)
            // f32 rounding can land just past 1
            .clamp(0.0, 1.0)
    }
}

/// Window a volume with an explicit center and width.
pub fn window<B: Backend>(volume: &Volume<B>, center: f64, width: f64) -> Result<Volume<B>> {
    Ok(WindowLevelFilter::new(WindowPreset::new(center, width)?).apply_tensor(volume))
}

/// Window a volume with a named preset.
pub fn apply_window<B: Backend>(
    volume: &Volume<B>,
    presets: &WindowPresets,
    name: &str,
) -> Result<Volume<B>> {
    Ok(WindowLevelFilter::from_preset(presets, name)?.apply_tensor(volume))
}

/// Adaptive PET window.
///
/// `lower` is a fixed floor, `upper` the given percentile of the volume.
/// After clipping and rescaling to [0, 1], every sample at or below
/// `threshold` is set to zero. If `upper <= lower` the whole output is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveWindow {
    /// Intensity mapped to 0.
    pub floor: f64,
    /// Percentile (0..=100) mapped to 1.
    pub percentile: f64,
    /// Rescaled values at or below this are zeroed.
    pub threshold: f64,
}

impl Default for AdaptiveWindow {
    fn default() -> Self {
        Self {
            floor: 1.0,
            percentile: 99.9,
            threshold: 0.3,
        }
    }
}

impl AdaptiveWindow {
    /// Create the default PET window (floor 1, 99.9th percentile, threshold 0.3).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the intensity floor.
    pub fn with_floor(mut self, floor: f64) -> Self {
        self.floor = floor;
        self
    }

    /// Set the ceiling percentile.
    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }

    /// Set the post-rescale threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(VivipetError::invalid_configuration(format!(
                "percentile must be within [0, 100], got {}",
                self.percentile
            )));
        }
        if !self.floor.is_finite() || !self.threshold.is_finite() {
            return Err(VivipetError::invalid_configuration(
                "adaptive window floor and threshold must be finite",
            ));
        }
        Ok(())
    }

    /// `(lower, upper)` intensity bounds this window uses for `volume`.
    pub fn bounds<B: Backend>(&self, volume: &Volume<B>) -> (f64, f64) {
        let mut voxels = to_voxels(volume);
        (self.floor, percentile(&mut voxels, self.percentile))
    }

    /// Apply the window to an image.
    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Image<B, 3> {
        image.with_data(self.apply_tensor(image.data()))
    }

    /// Apply the window to a bare volume.
    pub fn apply_tensor<B: Backend>(&self, volume: &Volume<B>) -> Volume<B> {
        let (lower, upper) = self.bounds(volume);
        tracing::info!("PET window: min={}, max={}", lower, upper);

        if upper.is_nan() || upper <= lower {
            tracing::warn!(
                "PET window range collapsed (upper {} <= lower {}); output is all zero",
                upper,
                lower
            );
            return Tensor::zeros(volume.dims(), &volume.device());
        }

        let windowed = volume
            .clone()
            .clamp(lower, upper)
            .sub_scalar(lower)
            .div_scalar(upper - lower)
            .clamp(0.0, 1.0);
        let background = windowed.clone().lower_equal_elem(self.threshold);
        windowed.mask_fill(background, 0.0)
    }
}

/// Adaptive PET window with the default parameters.
pub fn window_pet<B: Backend>(volume: &Volume<B>) -> Volume<B> {
    AdaptiveWindow::default().apply_tensor(volume)
}

/// The `q`-th percentile (0..=100) of `values`, linearly interpolated
/// between the two nearest ranks. Reorders `values`; NaN for an empty slice.
pub fn percentile(values: &mut [f32], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(values.len() - 1);
    let frac = rank - lo as f64;
    values[lo] as f64 + (values[hi] as f64 - values[lo] as f64) * frac
}
