//! Grid resampling.
//!
//! [`GridResampler`] re-samples a moving volume onto a target voxel grid. Both
//! volumes are placed in the same scanner world space by their spatial
//! frames, so no registration transform is involved: every target voxel is
//! carried to world space by the target frame, brought back into the moving
//! volume's index space by the inverse moving frame, and interpolated there.

use std::marker::PhantomData;
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::Matrix4;
use crate::error::{Result, VivipetError};
use crate::image::{generate_grid_3d, Image, Volume};
use crate::interpolation::{Interpolator, LinearInterpolator};
use crate::spatial::SpatialFrame;

/// Slack, in voxels, before a sample counts as outside the moving volume.
const BOUNDS_TOLERANCE: f32 = 1e-3;

/// Resample filter onto a fixed target grid.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `I` - The interpolator type
pub struct GridResampler<B, I = LinearInterpolator>
where
    B: Backend,
    I: Interpolator<B>,
{
    size: [usize; 3],
    frame: SpatialFrame,
    interpolator: I,
    default_pixel_value: f64,
    _phantom: PhantomData<B>,
}

impl<B, I> GridResampler<B, I>
where
    B: Backend,
    I: Interpolator<B>,
{
    /// Create a new resampler.
    ///
    /// # Arguments
    /// * `size` - Target grid shape in voxels
    /// * `frame` - Target voxel-to-world frame
    /// * `interpolator` - Interpolator used on the moving volume
    pub fn new(size: [usize; 3], frame: SpatialFrame, interpolator: I) -> Self {
        Self {
            size,
            frame,
            interpolator,
            default_pixel_value: 0.0,
            _phantom: PhantomData,
        }
    }

    /// Target the grid of a reference image.
    pub fn new_from_reference(reference: &Image<B, 3>, interpolator: I) -> Self {
        Self::new(reference.shape(), reference.frame(), interpolator)
    }

    /// Target the grid of an anchor volume that was block-reduced by `factor`
    /// after acquisition.
    ///
    /// `anchor_frame` is the frame of the anchor at full resolution; the target
    /// frame is that frame with its linear part scaled by `factor`.
    pub fn onto_downsampled_anchor(
        size: [usize; 3],
        anchor_frame: &SpatialFrame,
        factor: usize,
        interpolator: I,
    ) -> Self {
        Self::new(size, anchor_frame.scaled(factor), interpolator)
    }

    /// Set the value written where the target grid falls outside the moving volume.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Target grid shape.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Target frame.
    pub fn frame(&self) -> &SpatialFrame {
        &self.frame
    }

    /// Resample an image onto the target grid.
    ///
    /// # Errors
    /// Returns a geometry error if either frame is singular.
    pub fn apply(&self, input: &Image<B, 3>) -> Result<Image<B, 3>> {
        let data = self.resample_tensor(input.data(), &input.frame())?;
        Image::from_frame(data, &self.frame)
    }

    /// Resample a bare volume placed in world space by `moving_frame`.
    ///
    /// # Errors
    /// Returns a geometry error if either frame is singular and a volume
    /// error if the moving volume has an empty axis.
    pub fn resample_tensor(&self, moving: &Volume<B>, moving_frame: &SpatialFrame) -> Result<Volume<B>> {
        if moving.dims().contains(&0) {
            return Err(VivipetError::invalid_volume(format!(
                "cannot resample a volume with an empty axis: {:?}",
                moving.dims()
            )));
        }
        let mapping = self.frame.index_mapping_to(moving_frame)?;
        let device = moving.device();

        // 1. Every target voxel index, [N, 3]
        let target_indices = generate_grid_3d::<B>(self.size, &device);

        // 2. Target index -> world -> moving index in one affine step
        let moving_indices = apply_affine(target_indices, &mapping, &device);

        // 3. Interpolate, then replace samples outside the moving extent
        let values = self.interpolator.interpolate(moving, moving_indices.clone());
        let inside = inside_mask(moving_indices, moving.dims());
        let values = if self.default_pixel_value == 0.0 {
            values * inside
        } else {
            let outside = inside.clone().neg().add_scalar(1.0);
            values * inside + outside.mul_scalar(self.default_pixel_value)
        };

        tracing::debug!("Resampled {:?} onto grid {:?}", moving.dims(), self.size);
        Ok(values.reshape(Shape::new(self.size)))
    }
}

/// Re-sample `moving_volume` onto the grid described by `target_shape` and
/// `target_frame` with trilinear interpolation; outside samples are zero.
pub fn resample_to_grid<B: Backend>(
    moving_volume: &Volume<B>,
    moving_frame: &SpatialFrame,
    target_shape: [usize; 3],
    target_frame: &SpatialFrame,
) -> Result<Volume<B>> {
    GridResampler::new(target_shape, *target_frame, LinearInterpolator::new())
        .resample_tensor(moving_volume, moving_frame)
}

/// Apply a homogeneous affine to row points `[N, 3]`: `p' = p · Lᵀ + t`.
fn apply_affine<B: Backend>(points: Tensor<B, 2>, affine: &Matrix4<f64>, device: &B::Device) -> Tensor<B, 2> {
    let mut lt_data = Vec::with_capacity(9);
    for r in 0..3 {
        for c in 0..3 {
            lt_data.push(affine[(c, r)] as f32);
        }
    }
    let lt = Tensor::<B, 2>::from_data(TensorData::new(lt_data, Shape::new([3, 3])), device);

    let t_data: Vec<f32> = (0..3).map(|r| affine[(r, 3)] as f32).collect();
    let t = Tensor::<B, 2>::from_data(TensorData::new(t_data, Shape::new([1, 3])), device);

    points.matmul(lt) + t
}

/// 1.0 where the index lies within `[0, n - 1]` on every axis, else 0.0.
fn inside_mask<B: Backend>(indices: Tensor<B, 2>, dims: [usize; 3]) -> Tensor<B, 1> {
    let mut mask: Option<Tensor<B, 1, burn::tensor::Int>> = None;
    for (axis, n) in dims.iter().enumerate() {
        let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
        let valid = coord.clone().greater_equal_elem(-BOUNDS_TOLERANCE).int()
            * coord.lower_equal_elem((*n - 1) as f32 + BOUNDS_TOLERANCE).int();
        mask = Some(match mask {
            Some(m) => m * valid,
            None => valid,
        });
    }
    match mask {
        Some(m) => m.float(),
        None => Tensor::zeros([indices.dims()[0]], &indices.device()),
    }
}
