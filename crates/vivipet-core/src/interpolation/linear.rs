//! Trilinear interpolation.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use serde::{Deserialize, Serialize};
use super::trait_::Interpolator;

/// Trilinear interpolator.
///
/// Blends the 8 voxels surrounding each query index, matching first-order
/// spline resampling.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn gather<B: Backend>(
        flat_data: &Tensor<B, 1>,
        i: &Tensor<B, 1, Int>,
        j: &Tensor<B, 1, Int>,
        k: &Tensor<B, 1, Int>,
        stride_i: i32,
        stride_j: i32,
    ) -> Tensor<B, 1> {
        let idx = i.clone() * stride_i + j.clone() * stride_j + k.clone();
        flat_data.clone().gather(0, idx)
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims();
        let batch_size = indices.dims()[0];
        let device = indices.device();

        // indices: [Batch, 3] -> (i, j, k)
        let i = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let j = indices.clone().narrow(1, 1, 1).squeeze::<1>(1);
        let k = indices.narrow(1, 2, 1).squeeze::<1>(1);

        let i0 = i.clone().floor();
        let j0 = j.clone().floor();
        let k0 = k.clone().floor();

        let wi = i - i0.clone();
        let wj = j - j0.clone();
        let wk = k - k0.clone();

        let i1 = i0.clone() + 1.0;
        let j1 = j0.clone() + 1.0;
        let k1 = k0.clone() + 1.0;

        let i0_i = i0.clamp(0.0, (d0 - 1) as f64).int();
        let j0_i = j0.clamp(0.0, (d1 - 1) as f64).int();
        let k0_i = k0.clamp(0.0, (d2 - 1) as f64).int();
        let i1_i = i1.clamp(0.0, (d0 - 1) as f64).int();
        let j1_i = j1.clamp(0.0, (d1 - 1) as f64).int();
        let k1_i = k1.clamp(0.0, (d2 - 1) as f64).int();

        // Row-major [D0, D1, D2]
        let stride_i = (d1 * d2) as i32;
        let stride_j = d2 as i32;

        let flat_data = data.clone().reshape([d0 * d1 * d2]);

        let v000 = Self::gather(&flat_data, &i0_i, &j0_i, &k0_i, stride_i, stride_j);
        let v001 = Self::gather(&flat_data, &i0_i, &j0_i, &k1_i, stride_i, stride_j);
        let v010 = Self::gather(&flat_data, &i0_i, &j1_i, &k0_i, stride_i, stride_j);
        let v011 = Self::gather(&flat_data, &i0_i, &j1_i, &k1_i, stride_i, stride_j);
        let v100 = Self::gather(&flat_data, &i1_i, &j0_i, &k0_i, stride_i, stride_j);
        let v101 = Self::gather(&flat_data, &i1_i, &j0_i, &k1_i, stride_i, stride_j);
        let v110 = Self::gather(&flat_data, &i1_i, &j1_i, &k0_i, stride_i, stride_j);
        let v111 = Self::gather(&flat_data, &i1_i, &j1_i, &k1_i, stride_i, stride_j);

        let one = Tensor::<B, 1>::ones([batch_size], &device);
        let one_minus_wi = one.clone() - wi.clone();
        let one_minus_wj = one.clone() - wj.clone();
        let one_minus_wk = one - wk.clone();

        // Along k
        let c00 = v000 * one_minus_wk.clone() + v001 * wk.clone();
        let c01 = v010 * one_minus_wk.clone() + v011 * wk.clone();
        let c10 = v100 * one_minus_wk.clone() + v101 * wk.clone();
        let c11 = v110 * one_minus_wk + v111 * wk;

        // Along j
        let c0 = c00 * one_minus_wj.clone() + c01 * wj.clone();
        let c1 = c10 * one_minus_wj + c11 * wj;

        // Along i
        c0 * one_minus_wi + c1 * wi
    }
}
