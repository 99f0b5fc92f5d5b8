//! End-to-end PET/CT alignment and normalization.
//!
//! ```text
//! CT ──► downsample ──┬──────────────► crop ──► window (preset) ──► CT out
//!                     │ target grid      ▲
//! PET ─────────────► resample ─────► crop + shift ──► adaptive window ──► mask? ──► PET out
//! ```
//!
//! Either input may be absent. A PET without a CT skips the geometric stages
//! and is only windowed; a CT without a PET is still cropped and windowed.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use crate::error::{Result, VivipetError};
use crate::filter::{
    AdaptiveWindow, AlignmentCropper, DownsampleFilter, GridResampler, RegionMasker, RegionSpec,
    ShiftMode, ShiftVector, WindowLevelFilter, WindowPresets,
};
use crate::image::Image;
use crate::interpolation::LinearInterpolator;

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the CT window preset.
    pub window_preset: String,
    /// Block size of the CT downsample.
    pub downsample_factor: usize,
    /// Zero the bladder region on the PET output.
    pub remove_bladder: bool,
    /// PET-to-CT voxel offset applied after cropping.
    pub shift: ShiftVector,
    pub shift_mode: ShiftMode,
    /// Fraction of axis 0 kept past the midline.
    pub crop_margin: f64,
    /// Region zeroed when `remove_bladder` is set.
    pub bladder: RegionSpec,
    pub pet_window: AdaptiveWindow,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_preset: "animal".to_string(),
            downsample_factor: 2,
            remove_bladder: false,
            shift: ShiftVector::default(),
            shift_mode: ShiftMode::Wrap,
            crop_margin: 0.03,
            bladder: RegionSpec::bladder(),
            pet_window: AdaptiveWindow::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CT window preset.
    pub fn with_window_preset(mut self, name: impl Into<String>) -> Self {
        self.window_preset = name.into();
        self
    }

    /// Set the CT downsample factor.
    pub fn with_downsample_factor(mut self, factor: usize) -> Self {
        self.downsample_factor = factor;
        self
    }

    /// Enable/disable bladder masking.
    pub fn with_remove_bladder(mut self, enabled: bool) -> Self {
        self.remove_bladder = enabled;
        self
    }

    /// Set the PET shift and how it treats edges.
    pub fn with_shift(mut self, shift: ShiftVector, mode: ShiftMode) -> Self {
        self.shift = shift;
        self.shift_mode = mode;
        self
    }

    /// Set the crop margin fraction.
    pub fn with_crop_margin(mut self, margin: f64) -> Self {
        self.crop_margin = margin;
        self
    }

    /// Set the bladder region.
    pub fn with_bladder(mut self, region: RegionSpec) -> Self {
        self.bladder = region;
        self
    }

    /// Set the adaptive PET window.
    pub fn with_pet_window(mut self, window: AdaptiveWindow) -> Self {
        self.pet_window = window;
        self
    }

    /// Validate the configuration against a preset table.
    pub fn validate(&self, presets: &WindowPresets) -> Result<()> {
        if self.downsample_factor == 0 {
            return Err(VivipetError::invalid_configuration(
                "downsample factor must be a positive integer, got 0",
            ));
        }
        if !(0.0..0.5).contains(&self.crop_margin) {
            return Err(VivipetError::invalid_configuration(format!(
                "crop margin must lie in [0, 0.5), got {}",
                self.crop_margin
            )));
        }
        presets.get(&self.window_preset)?;
        self.pet_window.validate()
    }
}

/// Normalized volumes handed to the renderer.
#[derive(Debug, Clone)]
pub struct PipelineOutput<B: Backend> {
    pub ct: Option<Image<B, 3>>,
    pub pet: Option<Image<B, 3>>,
}

/// The configured stages, resolved once and reusable across runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    downsampler: DownsampleFilter,
    ct_window: WindowLevelFilter,
    cropper: AlignmentCropper,
    masker: Option<RegionMasker>,
}

impl Pipeline {
    /// Build a pipeline using the standard CT presets.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_presets(config, &WindowPresets::standard())
    }

    /// Build a pipeline resolving the CT preset in `presets`.
    pub fn with_presets(config: PipelineConfig, presets: &WindowPresets) -> Result<Self> {
        config.validate(presets)?;

        let downsampler = DownsampleFilter::new(config.downsample_factor)?;
        let ct_window = WindowLevelFilter::from_preset(presets, &config.window_preset)?;
        let cropper = AlignmentCropper::new(config.shift)
            .with_margin_fraction(config.crop_margin)?
            .with_shift_mode(config.shift_mode);
        let masker = config.remove_bladder.then(|| RegionMasker::new(config.bladder));

        Ok(Self {
            config,
            downsampler,
            ct_window,
            cropper,
            masker,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline.
    ///
    /// # Errors
    /// * Configuration error if both inputs are absent
    /// * Geometry error if a frame is singular
    /// * Volume error if the CT is too thin to crop
    pub fn run<B: Backend>(
        &self,
        ct: Option<&Image<B, 3>>,
        pet: Option<&Image<B, 3>>,
    ) -> Result<PipelineOutput<B>> {
        let (ct_out, pet_out) = match (ct, pet) {
            (None, None) => {
                return Err(VivipetError::invalid_configuration(
                    "at least one of CT or PET is required",
                ));
            }
            (Some(ct), Some(pet)) => {
                let ct_down = self.downsample_ct(ct);
                let resampler = GridResampler::onto_downsampled_anchor(
                    ct_down.shape(),
                    &ct.frame(),
                    self.config.downsample_factor,
                    LinearInterpolator::new(),
                );
                let pet_on_ct = resampler.apply(pet)?;
                tracing::info!("PET resampled onto CT grid: {:?}", pet_on_ct.shape());

                let (ct_cropped, pet_cropped) = self.cropper.crop_and_align(&ct_down, Some(&pet_on_ct))?;
                debug_assert_eq!(pet_cropped.as_ref().map(|p| p.shape()), Some(ct_cropped.shape()));
                let pet_windowed = pet_cropped.map(|p| self.config.pet_window.apply(&p));
                (Some(self.ct_window.apply(&ct_cropped)), pet_windowed)
            }
            (Some(ct), None) => {
                let ct_down = self.downsample_ct(ct);
                let (ct_cropped, _) = self.cropper.crop_and_align(&ct_down, None)?;
                (Some(self.ct_window.apply(&ct_cropped)), None)
            }
            (None, Some(pet)) => {
                tracing::info!("No CT supplied; windowing PET on its own grid");
                (None, Some(self.config.pet_window.apply(pet)))
            }
        };

        let pet_out = match (&self.masker, pet_out) {
            (Some(masker), Some(pet)) => Some(masker.apply(&pet)),
            (_, pet) => pet,
        };

        Ok(PipelineOutput {
            ct: ct_out,
            pet: pet_out,
        })
    }

    fn downsample_ct<B: Backend>(&self, ct: &Image<B, 3>) -> Image<B, 3> {
        let ct_down = self.downsampler.apply(ct);
        tracing::info!(
            "CT downsampled by {}: {:?} -> {:?}",
            self.downsampler.factor(),
            ct.shape(),
            ct_down.shape()
        );
        ct_down
    }
}
