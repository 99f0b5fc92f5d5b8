//! Volumetric PET/CT alignment and intensity normalization.
//!
//! A CT and a PET scan arrive on independent voxel grids. The [`pipeline`]
//! brings the PET onto a downsampled CT grid, crops both to one hemisphere,
//! applies a fixed alignment shift and maps intensities to [0, 1] for overlay
//! rendering.

pub mod error;
pub mod image;
pub mod spatial;
pub mod interpolation;
pub mod filter;
pub mod pipeline;
pub mod display;

pub use error::{Result, VivipetError};
pub use image::{Image, Volume};
pub use spatial::{Direction, Point, Spacing, SpatialFrame, Vector};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
