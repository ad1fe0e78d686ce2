use super::dispatch::{PREPARE_CHAIN, stage_command_for};
use super::helpers::{emit_report, load_parameters, run_stage, utc_timestamp};
use super::{CliError, GlobalArgs};
use skirt_prep_core::common::{
    AssemblyParameters, CameraParameters, IngestParameters, RunParameters, ViewParameters,
};
use skirt_prep_core::domain::{PipelineStage, PrepError, StageRequest};
use skirt_prep_core::modules::{StageOptions, execute_check};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, clap::Args)]
pub(super) struct IngestArgs {
    /// Glob matching the snapshot part files
    #[arg(long)]
    snapshot_glob: Option<String>,
    /// Host trajectory file
    #[arg(long)]
    host_coords: Option<PathBuf>,
    /// Snapshot number used to pick the host position
    #[arg(long)]
    snapnum: Option<u64>,
    /// Spherical cut radius around the host in kpc
    #[arg(long)]
    r_cut_kpc: Option<f64>,
    /// Dust-to-metals ratio recorded in meta.json
    #[arg(long)]
    dust_to_metals: Option<f64>,
    /// Snapshot length unit in kpc
    #[arg(long)]
    pos_to_kpc: Option<f64>,
    /// Host track length unit in kpc; defaults to --pos-to-kpc
    #[arg(long)]
    host_pos_to_kpc: Option<f64>,
    /// Snapshot mass unit in Msun; defaults to the header's UnitMassInG
    #[arg(long)]
    mass_to_msun: Option<f64>,
    /// Factor applied to every metallicity value
    #[arg(long)]
    metallicity_scale: Option<f64>,
    /// Column of a 2-D metallicity dataset to use
    #[arg(long)]
    metallicity_column: Option<usize>,
    /// Smoothing length in kpc for stars without one
    #[arg(long)]
    hsml_fallback_kpc: Option<f64>,
}

impl IngestArgs {
    fn apply(&self, params: &mut IngestParameters) {
        if let Some(glob) = &self.snapshot_glob {
            params.snapshot_glob = glob.clone();
        }
        if let Some(path) = &self.host_coords {
            params.host_coords = path.clone();
        }
        if let Some(snapnum) = self.snapnum {
            params.snapnum = snapnum;
        }
        if let Some(r_cut) = self.r_cut_kpc {
            params.r_cut_kpc = r_cut;
        }
        if let Some(ratio) = self.dust_to_metals {
            params.dust_to_metals = ratio;
        }
        if let Some(factor) = self.pos_to_kpc {
            params.pos_to_kpc = factor;
        }
        if self.host_pos_to_kpc.is_some() {
            params.host_pos_to_kpc = self.host_pos_to_kpc;
        }
        if self.mass_to_msun.is_some() {
            params.mass_to_msun = self.mass_to_msun;
        }
        if let Some(scale) = self.metallicity_scale {
            params.metallicity_scale = scale;
        }
        if let Some(column) = self.metallicity_column {
            params.metallicity_column = column;
        }
        if let Some(hsml) = self.hsml_fallback_kpc {
            params.hsml_fallback_kpc = hsml;
        }
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub(super) struct ViewArgs {
    /// Number of viewing directions
    #[arg(long)]
    num_views: Option<usize>,
}

impl ViewArgs {
    fn apply(&self, params: &mut ViewParameters) {
        if let Some(count) = self.num_views {
            params.num_views = count;
        }
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub(super) struct CameraArgs {
    /// Observer distance in Mpc, shared by cameras and assembly
    #[arg(long)]
    distance_mpc: Option<f64>,
}

impl CameraArgs {
    fn apply(&self, params: &mut CameraParameters) {
        if let Some(distance) = self.distance_mpc {
            params.distance_mpc = distance;
        }
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub(super) struct AssemblyArgs {
    /// File name of the configuration document inside the run directory
    #[arg(long)]
    ski_name: Option<String>,
    #[arg(long)]
    num_packets: Option<f64>,
    #[arg(long)]
    min_wavelength_micron: Option<f64>,
    #[arg(long)]
    max_wavelength_micron: Option<f64>,
    #[arg(long)]
    num_wavelengths: Option<usize>,
    /// Pixels per side of every instrument
    #[arg(long)]
    pixels: Option<usize>,
    /// Field of view in kpc; defaults to twice the cut radius
    #[arg(long)]
    fov_kpc: Option<f64>,
    #[arg(long)]
    min_level: Option<u32>,
    #[arg(long)]
    max_level: Option<u32>,
    #[arg(long)]
    max_dust_fraction: Option<f64>,
    /// Overrides the dust-to-metals ratio stored in meta.json
    #[arg(long)]
    assembly_dust_to_metals: Option<f64>,
    /// Stellar SED family selector
    #[arg(long)]
    sed_family: Option<String>,
    #[arg(long)]
    bb_radius_km: Option<f64>,
    #[arg(long)]
    bb_temperature_k: Option<f64>,
    /// Simulator input directory declared in the document, relative to the run directory
    #[arg(long)]
    ski_input_dir: Option<String>,
    /// Simulator output directory declared in the document, relative to the run directory
    #[arg(long)]
    ski_output_dir: Option<String>,
    /// Leave the producer timestamp out of the document
    #[arg(long)]
    no_timestamp: bool,
}

impl AssemblyArgs {
    fn apply(&self, params: &mut AssemblyParameters) {
        if let Some(name) = &self.ski_name {
            params.ski_name = name.clone();
        }
        if let Some(packets) = self.num_packets {
            params.num_packets = packets;
        }
        if let Some(min) = self.min_wavelength_micron {
            params.min_wavelength_micron = min;
        }
        if let Some(max) = self.max_wavelength_micron {
            params.max_wavelength_micron = max;
        }
        if let Some(count) = self.num_wavelengths {
            params.num_wavelengths = count;
        }
        if let Some(pixels) = self.pixels {
            params.pixels = pixels;
        }
        if self.fov_kpc.is_some() {
            params.field_of_view_kpc = self.fov_kpc;
        }
        if let Some(level) = self.min_level {
            params.min_level = level;
        }
        if let Some(level) = self.max_level {
            params.max_level = level;
        }
        if let Some(fraction) = self.max_dust_fraction {
            params.max_dust_fraction = fraction;
        }
        if self.assembly_dust_to_metals.is_some() {
            params.dust_to_metals = self.assembly_dust_to_metals;
        }
        if let Some(family) = &self.sed_family {
            params.sed_family = family.clone();
        }
        if let Some(radius) = self.bb_radius_km {
            params.bb_radius_km = radius;
        }
        if let Some(temperature) = self.bb_temperature_k {
            params.bb_temperature_k = temperature;
        }
        if let Some(dir) = &self.ski_input_dir {
            params.input_dir = dir.clone();
        }
        if let Some(dir) = &self.ski_output_dir {
            params.output_dir = dir.clone();
        }
    }

    fn timestamp(&self) -> Option<String> {
        (!self.no_timestamp).then(utc_timestamp)
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub(super) struct ReportArgs {
    /// Write the check report to this JSON file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Print the check report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct IngestCommand {
    #[command(flatten)]
    ingest: IngestArgs,
}

#[derive(clap::Args)]
pub(super) struct ViewsCommand {
    #[command(flatten)]
    views: ViewArgs,
}

#[derive(clap::Args)]
pub(super) struct CamerasCommand {
    #[command(flatten)]
    camera: CameraArgs,
}

#[derive(clap::Args)]
pub(super) struct AssembleCommand {
    #[command(flatten)]
    assembly: AssemblyArgs,
    #[command(flatten)]
    camera: CameraArgs,
}

#[derive(clap::Args)]
pub(super) struct ConsistencyCommand {
    #[command(flatten)]
    report: ReportArgs,
    #[command(flatten)]
    views: ViewArgs,
    #[command(flatten)]
    camera: CameraArgs,
    #[arg(long)]
    ski_name: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct OutputsCommand {
    #[command(flatten)]
    report: ReportArgs,
    /// Directory holding the simulator's images; defaults to the run directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Exit with an error when any instrument has no image
    #[arg(long)]
    strict: bool,
    #[arg(long)]
    ski_name: Option<String>,
}

#[derive(clap::Args)]
pub(super) struct PrepareCommand {
    #[command(flatten)]
    ingest: IngestArgs,
    #[command(flatten)]
    views: ViewArgs,
    #[command(flatten)]
    camera: CameraArgs,
    #[command(flatten)]
    assembly: AssemblyArgs,
    #[command(flatten)]
    report: ReportArgs,
}

pub(super) fn run_ingest_command(
    global: &GlobalArgs,
    args: IngestCommand,
) -> Result<i32, CliError> {
    let mut params = load_parameters(global)?;
    args.ingest.apply(&mut params.ingest);
    run_single_stage(PipelineStage::Ingest, global, &params, &StageOptions::default())
}

pub(super) fn run_views_command(global: &GlobalArgs, args: ViewsCommand) -> Result<i32, CliError> {
    let mut params = load_parameters(global)?;
    args.views.apply(&mut params.views);
    run_single_stage(PipelineStage::Views, global, &params, &StageOptions::default())
}

pub(super) fn run_cameras_command(
    global: &GlobalArgs,
    args: CamerasCommand,
) -> Result<i32, CliError> {
    let mut params = load_parameters(global)?;
    args.camera.apply(&mut params.camera);
    run_single_stage(PipelineStage::Cameras, global, &params, &StageOptions::default())
}

pub(super) fn run_assemble_command(
    global: &GlobalArgs,
    args: AssembleCommand,
) -> Result<i32, CliError> {
    let mut params = load_parameters(global)?;
    args.assembly.apply(&mut params.assembly);
    args.camera.apply(&mut params.camera);
    let options = StageOptions {
        timestamp: args.assembly.timestamp(),
        ..StageOptions::default()
    };
    run_single_stage(PipelineStage::Assemble, global, &params, &options)
}

pub(super) fn run_check_inputs_command(
    global: &GlobalArgs,
    args: ReportArgs,
) -> Result<i32, CliError> {
    let params = load_parameters(global)?;
    require_stage_input(PipelineStage::CheckInputs, &global.run_dir)?;
    run_check(
        PipelineStage::CheckInputs,
        &global.run_dir,
        &params,
        &StageOptions::default(),
        &args,
    )
}

pub(super) fn run_check_consistency_command(
    global: &GlobalArgs,
    args: ConsistencyCommand,
) -> Result<i32, CliError> {
    let mut params = load_parameters(global)?;
    args.views.apply(&mut params.views);
    args.camera.apply(&mut params.camera);
    if let Some(name) = args.ski_name {
        params.assembly.ski_name = name;
    }
    require_stage_input(PipelineStage::CheckConsistency, &global.run_dir)?;
    run_check(
        PipelineStage::CheckConsistency,
        &global.run_dir,
        &params,
        &StageOptions::default(),
        &args.report,
    )
}

pub(super) fn run_check_outputs_command(
    global: &GlobalArgs,
    args: OutputsCommand,
) -> Result<i32, CliError> {
    let mut params = load_parameters(global)?;
    if let Some(name) = args.ski_name {
        params.assembly.ski_name = name;
    }
    let options = StageOptions {
        output_dir: args.output_dir,
        strict: args.strict,
        ..StageOptions::default()
    };
    run_check(
        PipelineStage::CheckOutputs,
        &global.run_dir,
        &params,
        &options,
        &args.report,
    )
}

pub(super) fn run_prepare_command(
    global: &GlobalArgs,
    args: PrepareCommand,
) -> Result<i32, CliError> {
    let mut params = load_parameters(global)?;
    args.ingest.apply(&mut params.ingest);
    args.views.apply(&mut params.views);
    args.camera.apply(&mut params.camera);
    args.assembly.apply(&mut params.assembly);
    params.validate()?;

    let options = StageOptions {
        timestamp: args.assembly.timestamp(),
        ..StageOptions::default()
    };
    for stage in PREPARE_CHAIN {
        info!(stage = %stage, "running stage");
        match stage {
            PipelineStage::CheckInputs => {
                let quiet = ReportArgs::default();
                run_check(stage, &global.run_dir, &params, &options, &quiet)?;
            }
            PipelineStage::CheckConsistency => {
                run_check(stage, &global.run_dir, &params, &options, &args.report)?;
            }
            _ => {
                run_stage(stage, &global.run_dir, &params, &options)?;
            }
        }
    }
    println!(
        "prepared {} views at {} Mpc in {}",
        params.views.num_views,
        params.camera.distance_mpc,
        global.run_dir.display()
    );
    Ok(0)
}

fn run_single_stage(
    stage: PipelineStage,
    global: &GlobalArgs,
    params: &RunParameters,
    options: &StageOptions,
) -> Result<i32, CliError> {
    require_stage_input(stage, &global.run_dir)?;
    run_stage(stage, &global.run_dir, params, options)?;
    Ok(0)
}

fn run_check(
    stage: PipelineStage,
    run_dir: &Path,
    params: &RunParameters,
    options: &StageOptions,
    report_args: &ReportArgs,
) -> Result<i32, CliError> {
    let request = StageRequest::new(stage, run_dir);
    let report = execute_check(stage, &request, params, options)?;
    emit_report(stage, &report, report_args.report.as_ref(), report_args.json)?;
    println!("{}: passed", stage);
    Ok(0)
}

/// Names the upstream command when a stage's input is absent.
fn require_stage_input(stage: PipelineStage, run_dir: &Path) -> Result<(), CliError> {
    let Some(spec) = stage_command_for(stage) else {
        return Ok(());
    };
    let Some(artifact) = spec.input_artifact else {
        return Ok(());
    };
    let path = run_dir.join(artifact);
    if path.is_file() {
        return Ok(());
    }
    let producer = match artifact {
        "views.json" => "views",
        _ => "ingest",
    };
    Err(CliError::Stage(PrepError::resource_resolution(
        "INPUT.STAGE_ARTIFACT",
        format!(
            "'{}' needs '{}'; run `skirt-prep {}` first",
            spec.command,
            path.display(),
            producer
        ),
    )))
}
