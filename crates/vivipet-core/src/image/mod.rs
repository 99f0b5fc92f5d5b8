//! Image types and operations.
//!
//! [`Image`] couples a voxel tensor with its placement in world space;
//! [`Volume`] is the bare tensor that flows between stages once geometry no
//! longer matters.

pub mod image;
pub mod grid;
pub mod volume;

pub use image::Image;
pub use grid::generate_grid_3d;
pub use volume::{Volume, from_voxels, intensity_range, to_voxels, voxel_offset};
