use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use crate::image::{Image, Volume};

/// Axis-aligned voxel box given by a center and a half-size per axis.
///
/// Covers `[center - half_size, center + half_size)` on each axis. Bounds may
/// fall outside a volume; they are clipped when the box is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub center: [i64; 3],
    pub half_size: [i64; 3],
}

impl RegionSpec {
    pub fn new(center: [i64; 3], half_size: [i64; 3]) -> Self {
        Self { center, half_size }
    }

    /// Bladder hot-spot location for the standard animal protocol.
    pub fn bladder() -> Self {
        Self::new([170, 242, 170], [30, 30, 30])
    }

    /// Clipped half-open index range per axis, `None` if the box misses the volume.
    pub fn clip(&self, shape: [usize; 3]) -> Option<[std::ops::Range<usize>; 3]> {
        let mut ranges: [std::ops::Range<usize>; 3] = [0..0, 0..0, 0..0];
        for axis in 0..3 {
            let n = shape[axis] as i64;
            let start = (self.center[axis] - self.half_size[axis]).clamp(0, n);
            let end = (self.center[axis] + self.half_size[axis]).clamp(0, n);
            if start >= end {
                return None;
            }
            ranges[axis] = start as usize..end as usize;
        }
        Some(ranges)
    }
}

impl Default for RegionSpec {
    fn default() -> Self {
        Self::bladder()
    }
}

/// Zeroes one cuboid region of a volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionMasker {
    region: RegionSpec,
}

impl RegionMasker {
    pub fn new(region: RegionSpec) -> Self {
        Self { region }
    }

    pub fn region(&self) -> &RegionSpec {
        &self.region
    }

    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Image<B, 3> {
        image.with_data(self.apply_tensor(image.data()))
    }

    pub fn apply_tensor<B: Backend>(&self, volume: &Volume<B>) -> Volume<B> {
        let shape = volume.dims();
        match self.region.clip(shape) {
            Some(ranges) => {
                tracing::info!(
                    "Masking region {:?}..{:?}",
                    ranges.clone().map(|r| r.start),
                    ranges.clone().map(|r| r.end)
                );
                let dims = ranges.clone().map(|r| r.len());
                let zeros = Tensor::<B, 3>::zeros(dims, &volume.device());
                volume.clone().slice_assign(ranges, zeros)
            }
            None => {
                tracing::warn!("Mask region {:?} lies outside volume {:?}", self.region, shape);
                volume.clone()
            }
        }
    }
}

/// Copy of `volume` with the clipped box `[center - half_size, center + half_size)` set to zero.
pub fn mask_region<B: Backend>(volume: &Volume<B>, center: [i64; 3], half_size: [i64; 3]) -> Volume<B> {
    RegionMasker::new(RegionSpec::new(center, half_size)).apply_tensor(volume)
}
