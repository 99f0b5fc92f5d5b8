//! Hemisphere crop and fixed voxel-shift alignment.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use crate::error::{Result, VivipetError};
use crate::image::{Image, Volume};

/// Integer voxel displacement `(dx, dy, dz)` applied to the PET volume after cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftVector {
    pub dx: i64,
    pub dy: i64,
    pub dz: i64,
}

impl ShiftVector {
    pub fn new(dx: i64, dy: i64, dz: i64) -> Self {
        Self { dx, dy, dz }
    }

    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn to_array(&self) -> [i64; 3] {
        [self.dx, self.dy, self.dz]
    }
}

impl Default for ShiftVector {
    /// Empirical PET-to-CT offset of the animal scanner setup.
    fn default() -> Self {
        Self::new(0, 2, -7)
    }
}

/// How voxels pushed past an edge by the shift are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftMode {
    /// Circular rotation: voxels leaving one side re-enter on the other.
    #[default]
    Wrap,
    /// Voxels leaving the volume are dropped; vacated voxels become zero.
    ZeroFill,
}

/// Crops CT and PET to the left half along axis 0 (plus a margin past the
/// midline) and shifts the PET by a fixed voxel offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentCropper {
    margin_fraction: f64,
    shift: ShiftVector,
    mode: ShiftMode,
}

impl Default for AlignmentCropper {
    fn default() -> Self {
        Self {
            margin_fraction: 0.03,
            shift: ShiftVector::default(),
            mode: ShiftMode::Wrap,
        }
    }
}

impl AlignmentCropper {
    pub fn new(shift: ShiftVector) -> Self {
        Self { shift, ..Self::default() }
    }

    /// Fraction of the axis-0 extent removed from the midpoint, in `[0, 0.5)`.
    pub fn with_margin_fraction(mut self, margin_fraction: f64) -> Result<Self> {
        if !(0.0..0.5).contains(&margin_fraction) {
            return Err(VivipetError::invalid_configuration(format!(
                "crop margin must lie in [0, 0.5), got {}",
                margin_fraction
            )));
        }
        self.margin_fraction = margin_fraction;
        Ok(self)
    }

    pub fn with_shift_mode(mut self, mode: ShiftMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn shift(&self) -> ShiftVector {
        self.shift
    }

    pub fn shift_mode(&self) -> ShiftMode {
        self.mode
    }

    pub fn margin_fraction(&self) -> f64 {
        self.margin_fraction
    }

    /// Number of axis-0 slices kept for an axis-0 extent of `extent`.
    ///
    /// `floor(extent / 2) - floor(extent * margin)`
    pub fn cutoff(&self, extent: usize) -> Result<usize> {
        let midpoint = extent / 2;
        let margin = (extent as f64 * self.margin_fraction).floor() as usize;
        let cutoff = midpoint.saturating_sub(margin);
        if cutoff == 0 {
            return Err(VivipetError::invalid_volume(format!(
                "axis 0 extent {} leaves nothing after cropping",
                extent
            )));
        }
        Ok(cutoff)
    }

    /// Crop both images to `[0, cutoff)` along axis 0, then shift the PET.
    ///
    /// The cutoff comes from the CT extent; a shorter PET is cropped to its
    /// own extent. The crop keeps voxel (0, 0, 0), so geometry is unchanged.
    pub fn crop_and_align<B: Backend>(
        &self,
        ct: &Image<B, 3>,
        pet: Option<&Image<B, 3>>,
    ) -> Result<(Image<B, 3>, Option<Image<B, 3>>)> {
        let cutoff = self.cutoff(ct.shape()[0])?;
        tracing::info!("Cropping along axis 0 to {} slices", cutoff);

        let ct_cropped = ct.with_data(crop_axis0(ct.data(), cutoff));
        let pet_aligned = pet.map(|pet| {
            tracing::info!("Shifting PET by {:?} ({:?})", self.shift.to_array(), self.mode);
            let cropped = crop_axis0(pet.data(), cutoff);
            pet.with_data(shift_volume(cropped, self.shift, self.mode))
        });

        Ok((ct_cropped, pet_aligned))
    }
}

/// Crop and align bare volumes with the default margin and the given shift.
pub fn crop_and_align<B: Backend>(
    ct_volume: &Volume<B>,
    pet_volume: Option<&Volume<B>>,
    shift: ShiftVector,
) -> Result<(Volume<B>, Option<Volume<B>>)> {
    let cutoff = AlignmentCropper::new(shift).cutoff(ct_volume.dims()[0])?;
    let ct = crop_axis0(ct_volume, cutoff);
    let pet = pet_volume.map(|pet| shift_volume(crop_axis0(pet, cutoff), shift, ShiftMode::Wrap));
    Ok((ct, pet))
}

fn crop_axis0<B: Backend>(volume: &Volume<B>, cutoff: usize) -> Volume<B> {
    let keep = cutoff.min(volume.dims()[0]);
    volume.clone().narrow(0, 0, keep)
}

/// Shift a volume by `shift` voxels along each axis.
pub fn shift_volume<B: Backend>(volume: Volume<B>, shift: ShiftVector, mode: ShiftMode) -> Volume<B> {
    shift
        .to_array()
        .iter()
        .enumerate()
        .fold(volume, |acc, (axis, &s)| match mode {
            ShiftMode::Wrap => roll_axis(acc, axis, s),
            ShiftMode::ZeroFill => shift_axis_zero_fill(acc, axis, s),
        })
}

/// Circular shift: output index `(i + s) mod n` takes input index `i`.
fn roll_axis<B: Backend>(volume: Volume<B>, axis: usize, shift: i64) -> Volume<B> {
    let n = volume.dims()[axis];
    if n == 0 {
        return volume;
    }
    let s = shift.rem_euclid(n as i64) as usize;
    if s == 0 {
        return volume;
    }
    let tail = volume.clone().narrow(axis, n - s, s);
    let head = volume.narrow(axis, 0, n - s);
    Tensor::cat(vec![tail, head], axis)
}

fn shift_axis_zero_fill<B: Backend>(volume: Volume<B>, axis: usize, shift: i64) -> Volume<B> {
    let dims = volume.dims();
    let n = dims[axis];
    if shift == 0 || n == 0 {
        return volume;
    }
    let s = shift.unsigned_abs() as usize;
    if s >= n {
        return volume.zeros_like();
    }

    let mut pad_dims = dims;
    pad_dims[axis] = s;
    let pad = Tensor::<B, 3>::zeros(pad_dims, &volume.device());

    if shift > 0 {
        Tensor::cat(vec![pad, volume.narrow(axis, 0, n - s)], axis)
    } else {
        Tensor::cat(vec![volume.narrow(axis, s, n - s), pad], axis)
    }
}
