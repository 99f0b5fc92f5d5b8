//! Image type: a voxel volume with its placement in world space.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use crate::error::{Result, VivipetError};
use crate::spatial::{Direction, Point, Spacing, SpatialFrame, Vector};

/// Voxel volume with physical metadata.
///
/// Tensor axis `i` is voxel index component `i`: a sample at tensor position
/// `[i, j, k]` lives at `origin + Direction · (spacing ⊙ [i, j, k])` in world
/// space.
///
/// # Type Parameters
/// * `B` - The backend holding the voxel data
/// * `D` - The dimensionality (3 for scans)
///
/// # Examples
/// ```rust
/// use vivipet_core::Image;
/// use vivipet_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([64, 64, 32], &device);
/// let image = Image::new(
///     data,
///     Point3::new([0.0, 0.0, 0.0]),
///     Spacing3::new([0.5, 0.5, 1.0]),
///     Direction3::identity(),
/// );
/// assert_eq!(image.shape(), [64, 64, 32]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    /// Voxel intensities.
    data: Tensor<B, D>,
    /// World coordinate of voxel (0, 0, 0).
    origin: Point<D>,
    /// Physical distance between voxels along each axis.
    spacing: Spacing<D>,
    /// Orientation of the voxel axes.
    direction: Direction<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image with the given data and metadata.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    /// Same geometry, different voxels.
    ///
    /// Used by stages that rewrite intensities (windowing, masking) or that
    /// keep voxel (0, 0, 0) in place while changing the extent (cropping).
    pub fn with_data(&self, data: Tensor<B, D>) -> Self {
        Self {
            data,
            origin: self.origin,
            spacing: self.spacing,
            direction: self.direction,
        }
    }

    /// Get the voxel tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Get the origin.
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing.
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction.
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Image shape in voxels.
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Convert a world point to a continuous voxel index.
    ///
    /// `index = (Direction⁻¹ · (point - origin)) / spacing`
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Result<Point<D>> {
        let inv_dir = self
            .direction
            .try_inverse()
            .ok_or_else(|| VivipetError::geometry("direction matrix is singular"))?;
        let rotated = inv_dir * (*point - self.origin);

        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        Ok(index)
    }

    /// Convert a continuous voxel index to a world point.
    ///
    /// `point = origin + Direction · (index ⊙ spacing)`
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        let mut scaled = Vector::<D>::zeros();
        for i in 0..D {
            scaled[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled
    }
}

impl<B: Backend> Image<B, 3> {
    /// Build an image from voxels and a voxel-to-world affine.
    ///
    /// Fails with a geometry error when the affine is singular.
    pub fn from_frame(data: Tensor<B, 3>, frame: &SpatialFrame) -> Result<Self> {
        let (origin, spacing, direction) = frame.decompose()?;
        Ok(Self::new(data, origin, spacing, direction))
    }

    /// Voxel-to-world affine of this image.
    pub fn frame(&self) -> SpatialFrame {
        SpatialFrame::from_geometry(&self.origin, &self.spacing, &self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::spatial::{Direction3, Point3, Spacing3};

    type Backend = NdArray<f32>;

    fn pet_image() -> Image<Backend, 3> {
        let device = Default::default();
        Image::new(
            Tensor::<Backend, 3>::zeros([8, 6, 4], &device),
            Point3::new([-10.0, 5.0, 2.0]),
            Spacing3::new([2.0, 2.0, 4.0]),
            Direction3::identity(),
        )
    }

    #[test]
    fn test_image_shape() {
        assert_eq!(pet_image().shape(), [8, 6, 4]);
    }

    #[test]
    fn test_physical_to_index() {
        let image = pet_image();
        let index = image
            .transform_physical_point_to_continuous_index(&Point3::new([-6.0, 9.0, 10.0]))
            .unwrap();
        assert!((index[0] - 2.0).abs() < 1e-9);
        assert!((index[1] - 2.0).abs() < 1e-9);
        assert!((index[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_index_to_physical_matches_frame() {
        let image = pet_image();
        let index = Point3::new([1.5, 2.0, 3.0]);
        let via_image = image.transform_continuous_index_to_physical_point(&index);
        let via_frame = image.frame().index_to_world(&index);
        for i in 0..3 {
            assert!((via_image[i] - via_frame[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_from_frame_roundtrip() {
        let image = pet_image();
        let rebuilt = Image::from_frame(image.data().clone(), &image.frame()).unwrap();
        assert_eq!(rebuilt.origin(), image.origin());
        assert_eq!(rebuilt.spacing(), image.spacing());
    }

    #[test]
    fn test_from_singular_frame_fails() {
        let device = Default::default();
        let frame = SpatialFrame::from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ]);
        let data = Tensor::<Backend, 3>::zeros([2, 2, 2], &device);
        assert!(Image::from_frame(data, &frame).is_err());
    }
}
