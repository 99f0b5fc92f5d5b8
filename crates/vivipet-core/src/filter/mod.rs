//! Volume filters making up the PET/CT normalization pipeline.

pub mod downsample;
pub mod window;
pub mod resample;
pub mod crop;
pub mod mask;

pub use downsample::{downsample, DownsampleFilter};
pub use window::{
    apply_window, percentile, window, window_pet, AdaptiveWindow, WindowLevelFilter, WindowPreset,
    WindowPresets,
};
pub use resample::{resample_to_grid, GridResampler};
pub use crop::{crop_and_align, shift_volume, AlignmentCropper, ShiftMode, ShiftVector};
pub use mask::{mask_region, RegionMasker, RegionSpec};
