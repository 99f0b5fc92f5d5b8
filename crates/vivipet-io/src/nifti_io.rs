use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use ndarray::{Array3, Axis};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;
use vivipet_core::image::{from_voxels, to_voxels};
use vivipet_core::{Image, SpatialFrame};

/// Read a `.nii` or `.nii.gz` file as a 3-D image.
///
/// Voxels keep the file's `[X, Y, Z]` index order: tensor axis 0 is the first
/// NIfTI axis. Trailing singleton axes (e.g. a one-frame time series) are
/// dropped.
pub fn read_nifti<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, 3>> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let frame = header_frame(obj.header());

    let mut volume = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;
    while volume.ndim() > 3 && volume.shape()[volume.ndim() - 1] == 1 {
        let last = volume.ndim() - 1;
        volume = volume.index_axis_move(Axis(last), 0);
    }
    if volume.ndim() != 3 {
        anyhow::bail!("Expected 3D NIfTI file, found shape {:?}", volume.shape());
    }
    let shape = [volume.shape()[0], volume.shape()[1], volume.shape()[2]];

    // Logical (row-major) order regardless of the array's memory layout
    let voxels: Vec<f32> = volume.iter().copied().collect();
    let tensor = from_voxels::<B>(voxels, shape, device);

    let image = Image::from_frame(tensor, &frame)
        .with_context(|| format!("Invalid voxel-to-world affine in {}", path.display()))?;
    tracing::info!(
        "Loaded {} with shape {:?}, spacing {:?}",
        path.display(),
        shape,
        image.spacing().to_array()
    );
    Ok(image)
}

/// Voxel-to-world frame from a header: sform, then qform, then pixdim.
fn header_frame(header: &NiftiHeader) -> SpatialFrame {
    let rows = if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z]
    } else if header.qform_code > 0 {
        // NIfTI-1 quaternion form
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();

        let qfac = if header.pixdim[0] == 0.0 { 1.0 } else { header.pixdim[0] };

        let r11 = a * a + b * b - c * c - d * d;
        let r12 = 2.0 * b * c - 2.0 * a * d;
        let r13 = 2.0 * b * d + 2.0 * a * c;

        let r21 = 2.0 * b * c + 2.0 * a * d;
        let r22 = a * a + c * c - b * b - d * d;
        let r23 = 2.0 * c * d - 2.0 * a * b;

        let r31 = 2.0 * b * d - 2.0 * a * c;
        let r32 = 2.0 * c * d + 2.0 * a * b;
        let r33 = a * a + d * d - c * c - b * b;

        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;

        [
            [r11 * dx, r12 * dy, r13 * dz, header.quatern_x],
            [r21 * dx, r22 * dy, r23 * dz, header.quatern_y],
            [r31 * dx, r32 * dy, r33 * dz, header.quatern_z],
        ]
    } else {
        tracing::warn!("NIfTI header has neither sform nor qform; using pixdim only");
        let size = |d: f32| if d > 0.0 { d } else { 1.0 };
        [
            [size(header.pixdim[1]), 0.0, 0.0, 0.0],
            [0.0, size(header.pixdim[2]), 0.0, 0.0],
            [0.0, 0.0, size(header.pixdim[3]), 0.0],
        ]
    };

    SpatialFrame::from_rows(rows.map(|row| row.map(f64::from)))
}

/// Write an image to a NIfTI file.
///
/// The image frame is stored as the sform so the output overlays its source
/// scan in any NIfTI viewer. A `.gz` extension produces a compressed file.
pub fn write_nifti<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    use nifti::writer::WriterOptions;

    let path = path.as_ref();
    let [nx, ny, nz] = image.shape();
    let array = Array3::from_shape_vec((nx, ny, nz), to_voxels(image.data()))
        .context("Failed to create ndarray")?;

    let affine = *image.frame().affine();
    let row = |r: usize| [0, 1, 2, 3].map(|c| affine[(r, c)] as f32);
    let spacing = image.spacing().to_array().map(|s| s as f32);

    let header = NiftiHeader {
        sform_code: 1,
        qform_code: 0,
        srow_x: row(0),
        srow_y: row(1),
        srow_z: row(2),
        pixdim: [1.0, spacing[0], spacing[1], spacing[2], 1.0, 1.0, 1.0, 1.0],
        ..NiftiHeader::default()
    };

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;

    tracing::info!("Wrote {} ({}x{}x{})", path.display(), nx, ny, nz);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ndarray::Array4;
    use nifti::writer::WriterOptions;
    use tempfile::tempdir;
    use vivipet_core::image::voxel_offset;
    use vivipet_core::spatial::{Direction3, Point3, Spacing3};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_read_keeps_xyz_order() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.nii");

        // value = 100*x + 10*y + z
        let array = Array3::from_shape_fn((3, 4, 5), |(x, y, z)| (100 * x + 10 * y + z) as f32);
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let device = Default::default();
        let image = read_nifti::<TestBackend, _>(&file_path, &device)?;

        assert_eq!(image.shape(), [3, 4, 5]);
        let voxels = to_voxels(image.data());
        assert_eq!(voxels[voxel_offset([3, 4, 5], [2, 1, 3])], 213.0);
        assert_eq!(voxels[voxel_offset([3, 4, 5], [0, 3, 4])], 34.0);

        Ok(())
    }

    #[test]
    fn test_trailing_singleton_axis_is_squeezed() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("frame.nii");
        let array = Array4::<f32>::from_elem((2, 3, 4, 1), 7.0);
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let image = read_nifti::<TestBackend, _>(&file_path, &Default::default())?;
        assert_eq!(image.shape(), [2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_four_dimensional_series_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("series.nii");
        let array = Array4::<f32>::zeros((2, 2, 2, 3));
        WriterOptions::new(&file_path).write_nifti(&array)?;

        assert!(read_nifti::<TestBackend, _>(&file_path, &Default::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_written_geometry_is_read_back() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("ct.nii.gz");
        let device = Default::default();

        let voxels: Vec<f32> = (0..24).map(|v| v as f32 * 0.5).collect();
        let image = Image::new(
            from_voxels::<TestBackend>(voxels.clone(), [2, 3, 4], &device),
            Point3::new([-12.5, 4.0, 30.0]),
            Spacing3::new([0.25, 0.5, 2.0]),
            Direction3::identity(),
        );
        write_nifti(&file_path, &image)?;

        let loaded = read_nifti::<TestBackend, _>(&file_path, &device)?;
        assert_eq!(loaded.shape(), [2, 3, 4]);
        assert_eq!(to_voxels(loaded.data()), voxels);
        for i in 0..3 {
            assert!((loaded.origin()[i] - image.origin()[i]).abs() < 1e-4);
            assert!((loaded.spacing()[i] - image.spacing()[i]).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_missing_file_has_context() {
        let result = read_nifti::<TestBackend, _>("/non/existent/scan.nii", &Default::default());
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("Failed to read NIfTI file"));
    }
}
