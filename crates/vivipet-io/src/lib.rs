//! NIfTI input and output for vivipet images.

pub mod nifti_io;
pub mod summary;

pub use nifti_io::{read_nifti, write_nifti};
pub use summary::VolumeSummary;
