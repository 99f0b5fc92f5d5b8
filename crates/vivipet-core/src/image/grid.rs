use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Generate the continuous index of every voxel of a 3-D grid.
///
/// Returns a tensor of shape `[N, 3]` in row-major voxel order, where row
/// `n` holds `[i, j, k]` for the n-th voxel and N is the voxel count.
///
/// # Arguments
/// * `shape` - The grid shape `[D0, D1, D2]`
/// * `device` - The device to create the tensor on
pub fn generate_grid_3d<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let [d0, d1, d2] = shape;
    let total = d0 * d1 * d2;

    let mut grid = Vec::with_capacity(total * 3);
    for i in 0..d0 {
        for j in 0..d1 {
            for k in 0..d2 {
                grid.push(i as f32);
                grid.push(j as f32);
                grid.push(k as f32);
            }
        }
    }

    Tensor::<B, 2>::from_data(TensorData::new(grid, Shape::new([total, 3])), device)
}
