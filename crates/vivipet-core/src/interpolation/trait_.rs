//! Interpolator trait for sampling volumes at fractional voxel indices.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Samples a volume at continuous voxel indices.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values of `data` at the given indices.
    ///
    /// # Arguments
    /// * `data` - Source volume `[D0, D1, D2]`
    /// * `indices` - Continuous indices `[Batch, 3]`; column `c` indexes axis `c` of `data`
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`. Indices outside the volume are
    /// clamped to the nearest edge; callers that need a fill value mask them.
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
