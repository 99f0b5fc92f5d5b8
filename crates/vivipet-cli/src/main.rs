use anyhow::{Context, Result};
use burn_ndarray::{NdArray, NdArrayDevice};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use vivipet_core::display::TransferFunction;
use vivipet_core::filter::{RegionSpec, ShiftMode, ShiftVector};
use vivipet_core::{Image, Pipeline, PipelineConfig};
use vivipet_io::{read_nifti, write_nifti, VolumeSummary};

type Backend = NdArray<f32>;

#[derive(Parser, Debug)]
#[command(name = "vivipet")]
#[command(about = "Align a PET scan to a CT scan and normalize both for overlay viewing")]
struct Cli {
    /// Path to CT .nii / .nii.gz
    #[arg(long)]
    ct: Option<PathBuf>,

    /// Path to PET .nii / .nii.gz
    #[arg(long)]
    pet: Option<PathBuf>,

    /// CT window preset (soft_tissue, amide, animal)
    #[arg(long, default_value = "animal")]
    ct_window: String,

    /// CT block-mean downsample factor
    #[arg(long, default_value_t = 2)]
    downsample: usize,

    /// Zero the bladder region on the PET output
    #[arg(long)]
    remove_bladder: bool,

    /// PET voxel shift applied after cropping
    #[arg(long, num_args = 3, value_names = ["DX", "DY", "DZ"], allow_negative_numbers = true,
          default_values_t = [0i64, 2, -7])]
    shift: Vec<i64>,

    /// How the shift treats voxels pushed past the volume edge
    #[arg(long, value_enum, default_value_t = ShiftModeArg::Wrap)]
    shift_mode: ShiftModeArg,

    /// Bladder region center in voxels
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true,
          default_values_t = [170i64, 242, 170])]
    bladder_center: Vec<i64>,

    /// Bladder region half-size in voxels
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [30i64, 30, 30])]
    bladder_size: Vec<i64>,

    /// Directory receiving ct_normalized.nii.gz and pet_normalized.nii.gz
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShiftModeArg {
    Wrap,
    ZeroFill,
}

impl From<ShiftModeArg> for ShiftMode {
    fn from(arg: ShiftModeArg) -> Self {
        match arg {
            ShiftModeArg::Wrap => ShiftMode::Wrap,
            ShiftModeArg::ZeroFill => ShiftMode::ZeroFill,
        }
    }
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig> {
        let [dx, dy, dz] = triple(&self.shift, "--shift")?;
        let bladder = RegionSpec::new(
            triple(&self.bladder_center, "--bladder-center")?,
            triple(&self.bladder_size, "--bladder-size")?,
        );
        Ok(PipelineConfig::new()
            .with_window_preset(self.ct_window.clone())
            .with_downsample_factor(self.downsample)
            .with_remove_bladder(self.remove_bladder)
            .with_shift(ShiftVector::new(dx, dy, dz), self.shift_mode.into())
            .with_bladder(bladder))
    }
}

fn triple(values: &[i64], flag: &str) -> Result<[i64; 3]> {
    <[i64; 3]>::try_from(values)
        .map_err(|_| anyhow::anyhow!("{} takes exactly 3 values, got {}", flag, values.len()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    if cli.ct.is_none() && cli.pet.is_none() {
        anyhow::bail!("Nothing to do: pass --ct, --pet or both");
    }

    let pipeline = Pipeline::new(cli.config()?).context("Invalid pipeline configuration")?;
    let device = NdArrayDevice::default();

    let ct = cli.ct.as_deref().map(|p| load(p, "CT", &device)).transpose()?;
    let pet = cli.pet.as_deref().map(|p| load(p, "PET", &device)).transpose()?;

    let output = pipeline.run(ct.as_ref(), pet.as_ref())?;

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("Failed to create output directory {}", cli.out_dir.display()))?;

    if let Some(ct) = &output.ct {
        write_nifti(cli.out_dir.join("ct_normalized.nii.gz"), ct)?;
        log_display("CT", &TransferFunction::ct());
    }
    if let Some(pet) = &output.pet {
        write_nifti(cli.out_dir.join("pet_normalized.nii.gz"), pet)?;
        log_display("PET", &TransferFunction::pet());
    }

    Ok(())
}

fn load(path: &Path, name: &str, device: &NdArrayDevice) -> Result<Image<Backend, 3>> {
    let image = read_nifti::<Backend, _>(path, device)
        .with_context(|| format!("Failed to load {} scan", name))?;
    info!("{}: {}", name, VolumeSummary::of(&image));
    Ok(image)
}

fn log_display(name: &str, tf: &TransferFunction) {
    info!("{} display: colormap {}, opacity {:?}", name, tf.colormap, tf.opacity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use vivipet_core::image::{from_voxels, to_voxels};
    use vivipet_core::spatial::{Direction3, Point3, Spacing3};

    #[test]
    fn test_defaults_match_animal_protocol() {
        let cli = Cli::try_parse_from(["vivipet", "--ct", "ct.nii"]).unwrap();
        let config = cli.config().unwrap();

        assert_eq!(config.window_preset, "animal");
        assert_eq!(config.downsample_factor, 2);
        assert!(!config.remove_bladder);
        assert_eq!(config.shift, ShiftVector::new(0, 2, -7));
        assert_eq!(config.shift_mode, ShiftMode::Wrap);
        assert_eq!(config.bladder, RegionSpec::bladder());
    }

    #[test]
    fn test_negative_shift_and_mode_parse() {
        let cli = Cli::try_parse_from([
            "vivipet", "--pet", "pet.nii", "--shift", "-1", "0", "3", "--shift-mode", "zero-fill",
            "--remove-bladder",
        ])
        .unwrap();
        let config = cli.config().unwrap();

        assert_eq!(config.shift, ShiftVector::new(-1, 0, 3));
        assert_eq!(config.shift_mode, ShiftMode::ZeroFill);
        assert!(config.remove_bladder);
    }

    #[test]
    fn test_no_inputs_is_an_error() {
        let cli = Cli::try_parse_from(["vivipet"]).unwrap();
        assert!(run(&cli).is_err());
    }

    #[test]
    fn test_run_writes_normalized_volumes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let device = NdArrayDevice::default();
        let scan = |voxels: Vec<f32>| {
            Image::new(
                from_voxels::<Backend>(voxels, [8, 4, 4], &device),
                Point3::origin(),
                Spacing3::uniform(1.0),
                Direction3::identity(),
            )
        };
        let ct_path = dir.path().join("ct.nii");
        let pet_path = dir.path().join("pet.nii");
        write_nifti(&ct_path, &scan((0..128).map(|v| (v * 10) as f32).collect()))?;
        write_nifti(&pet_path, &scan(vec![5.0; 128]))?;

        let out_dir = dir.path().join("out");
        let args: Vec<OsString> = vec![
            "vivipet".into(),
            "--ct".into(),
            ct_path.clone().into_os_string(),
            "--pet".into(),
            pet_path.clone().into_os_string(),
            "--downsample".into(),
            "1".into(),
            "--out-dir".into(),
            out_dir.clone().into_os_string(),
        ];
        let cli = Cli::try_parse_from(args)?;
        run(&cli)?;

        let ct = read_nifti::<Backend, _>(out_dir.join("ct_normalized.nii.gz"), &device)?;
        let pet = read_nifti::<Backend, _>(out_dir.join("pet_normalized.nii.gz"), &device)?;
        assert_eq!(ct.shape(), [4, 4, 4]);
        assert_eq!(pet.shape(), [4, 4, 4]);
        assert!(to_voxels(ct.data()).iter().all(|v| (0.0..=1.0).contains(v)));
        Ok(())
    }
}
