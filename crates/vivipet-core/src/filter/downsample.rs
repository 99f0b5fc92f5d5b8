use burn::tensor::backend::Backend;
use crate::error::{Result, VivipetError};
use crate::image::{from_voxels, to_voxels, voxel_offset, Image, Volume};

/// Block-mean downsample filter.
///
/// Splits the volume into non-overlapping cubes of side `factor` and replaces
/// each cube with the mean of its voxels. Trailing partial blocks are averaged
/// over the voxels they actually contain, so the output shape along each axis
/// is `ceil(n / factor)`.
///
/// When applied to an [`Image`] the spacing is multiplied by `factor` and the
/// origin is kept, so the output frame is the input frame with its linear part
/// scaled by `factor`.
#[derive(Debug, Clone, Copy)]
pub struct DownsampleFilter {
    factor: usize,
}

impl DownsampleFilter {
    /// Create a new downsample filter.
    ///
    /// # Errors
    /// Returns a configuration error if `factor` is zero.
    pub fn new(factor: usize) -> Result<Self> {
        if factor == 0 {
            return Err(VivipetError::invalid_configuration(
                "downsample factor must be a positive integer, got 0",
            ));
        }
        Ok(Self { factor })
    }

    /// The block side length.
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Output shape for an input of `shape`.
    pub fn output_shape(&self, shape: [usize; 3]) -> [usize; 3] {
        shape.map(|n| n.div_ceil(self.factor))
    }

    /// Apply the filter to an image.
    pub fn apply<B: Backend>(&self, image: &Image<B, 3>) -> Image<B, 3> {
        let data = self.apply_tensor(image.data());
        Image::new(
            data,
            *image.origin(),
            image.spacing().coarsened(self.factor),
            *image.direction(),
        )
    }

    /// Apply the filter to a bare volume.
    pub fn apply_tensor<B: Backend>(&self, volume: &Volume<B>) -> Volume<B> {
        if self.factor == 1 {
            return volume.clone();
        }

        let shape = volume.dims();
        let out_shape = self.output_shape(shape);
        let f = self.factor;
        let voxels = to_voxels(volume);

        let mut sums = vec![0.0f64; out_shape.iter().product()];
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                let row = voxel_offset(shape, [i, j, 0]);
                let out_row = voxel_offset(out_shape, [i / f, j / f, 0]);
                for k in 0..shape[2] {
                    sums[out_row + k / f] += voxels[row + k] as f64;
                }
            }
        }

        // Voxels in block `b` along an axis of length `n`
        let count = |n: usize, b: usize| (n - b * f).min(f);

        let mut means = Vec::with_capacity(sums.len());
        for a in 0..out_shape[0] {
            let ca = count(shape[0], a);
            for b in 0..out_shape[1] {
                let cb = count(shape[1], b);
                for c in 0..out_shape[2] {
                    let cc = count(shape[2], c);
                    let n = (ca * cb * cc) as f64;
                    means.push((sums[voxel_offset(out_shape, [a, b, c])] / n) as f32);
                }
            }
        }

        tracing::debug!("Downsampled {:?} -> {:?} (factor {})", shape, out_shape, f);
        from_voxels(means, out_shape, &volume.device())
    }
}

/// Block-mean downsample of a bare volume by `factor` along every axis.
pub fn downsample<B: Backend>(volume: &Volume<B>, factor: usize) -> Result<Volume<B>> {
    Ok(DownsampleFilter::new(factor)?.apply_tensor(volume))
}
