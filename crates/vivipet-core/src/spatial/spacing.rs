//! Voxel spacing.

use super::Vector;

/// Physical distance between adjacent voxels along each axis, in millimetres.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing on every axis.
    pub fn uniform(value: f64) -> Self {
        Self::new([value; D])
    }

    /// Spacing after block-reducing every axis by `factor`.
    pub fn coarsened(&self, factor: usize) -> Self {
        *self * factor as f64
    }
}
