//! Plain voxel volumes and host-side access to their samples.
//!
//! Stages that need random access to every voxel (block reduction,
//! percentiles) pull the samples to the host once, work on a flat
//! row-major buffer and push the result back as a new tensor.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// A 3-D voxel array with no spatial metadata.
pub type Volume<B> = Tensor<B, 3>;

/// Copy the samples of a volume into a row-major `Vec<f32>`.
pub fn to_voxels<B: Backend>(volume: &Volume<B>) -> Vec<f32> {
    volume.to_data().iter::<f32>().collect()
}

/// Build a volume from row-major samples.
///
/// # Panics
/// Panics if `voxels.len()` is not the product of `shape`.
pub fn from_voxels<B: Backend>(voxels: Vec<f32>, shape: [usize; 3], device: &B::Device) -> Volume<B> {
    assert_eq!(
        voxels.len(),
        shape.iter().product::<usize>(),
        "voxel count does not match shape {:?}",
        shape
    );
    Tensor::<B, 3>::from_data(TensorData::new(voxels, Shape::new(shape)), device)
}

/// Row-major offset of voxel `[i, j, k]` in a volume of `shape`.
#[inline]
pub fn voxel_offset(shape: [usize; 3], index: [usize; 3]) -> usize {
    (index[0] * shape[1] + index[1]) * shape[2] + index[2]
}

/// Minimum and maximum sample, or `None` for an empty volume.
pub fn intensity_range<B: Backend>(volume: &Volume<B>) -> Option<(f32, f32)> {
    to_voxels(volume).into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    #[test]
    fn test_voxel_roundtrip_keeps_order() {
        let device = Default::default();
        let voxels: Vec<f32> = (0..24).map(|v| v as f32).collect();
        let volume = from_voxels::<Backend>(voxels.clone(), [2, 3, 4], &device);
        assert_eq!(volume.dims(), [2, 3, 4]);
        assert_eq!(to_voxels(&volume), voxels);
    }

    #[test]
    fn test_voxel_offset() {
        assert_eq!(voxel_offset([2, 3, 4], [0, 0, 0]), 0);
        assert_eq!(voxel_offset([2, 3, 4], [0, 0, 3]), 3);
        assert_eq!(voxel_offset([2, 3, 4], [0, 1, 0]), 4);
        assert_eq!(voxel_offset([2, 3, 4], [1, 2, 3]), 23);
    }

    #[test]
    fn test_intensity_range() {
        let device = Default::default();
        let volume = from_voxels::<Backend>(vec![3.0, -1.0, 7.5, 0.0], [1, 2, 2], &device);
        assert_eq!(intensity_range(&volume), Some((-1.0, 7.5)));
    }
}
