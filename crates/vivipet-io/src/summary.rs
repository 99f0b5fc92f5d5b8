use std::fmt;
use burn::tensor::backend::Backend;
use vivipet_core::image::intensity_range;
use vivipet_core::Image;

/// Shape, voxel size and intensity range of a loaded scan.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSummary {
    pub shape: [usize; 3],
    pub voxel_sizes: [f64; 3],
    /// `None` for an empty volume.
    pub range: Option<(f32, f32)>,
}

impl VolumeSummary {
    pub fn of<B: Backend>(image: &Image<B, 3>) -> Self {
        Self {
            shape: image.shape(),
            voxel_sizes: image.frame().voxel_sizes().to_array(),
            range: intensity_range(image.data()),
        }
    }
}

impl fmt::Display for VolumeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.voxel_sizes;
        write!(f, "shape {:?}, voxel size ({:.3}, {:.3}, {:.3}) mm", self.shape, x, y, z)?;
        match self.range {
            Some((min, max)) => write!(f, ", min {}, max {}", min, max),
            None => write!(f, ", empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use vivipet_core::image::from_voxels;
    use vivipet_core::spatial::{Direction3, Point3, Spacing3};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_summary_reports_geometry_and_range() {
        let image = Image::new(
            from_voxels::<TestBackend>(vec![-3.0, 0.0, 5.5, 2.0], [1, 2, 2], &Default::default()),
            Point3::origin(),
            Spacing3::new([0.5, 0.5, 2.0]),
            Direction3::identity(),
        );
        let summary = VolumeSummary::of(&image);

        assert_eq!(summary.shape, [1, 2, 2]);
        assert_eq!(summary.range, Some((-3.0, 5.5)));
        assert_eq!(
            summary.to_string(),
            "shape [1, 2, 2], voxel size (0.500, 0.500, 2.000) mm, min -3, max 5.5"
        );
    }
}
