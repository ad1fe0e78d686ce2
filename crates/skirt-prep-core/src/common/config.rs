//! Run parameters shared by every pipeline stage.
//!
//! A single immutable [`RunParameters`] value is built once per invocation
//! (defaults, then an optional JSON file, then command-line overrides) and
//! handed by reference to each stage. The camera distance, view count and unit
//! factors therefore have exactly one source.

use super::constants::{
    DEFAULT_BB_RADIUS_KM, DEFAULT_BB_TEMPERATURE_K, DEFAULT_DISTANCE_MPC, DEFAULT_DUST_TO_METALS,
    DEFAULT_HOST_COORDS, DEFAULT_HSML_FALLBACK_KPC, DEFAULT_MAX_DUST_FRACTION, DEFAULT_MAX_LEVEL,
    DEFAULT_MAX_WAVELENGTH_MICRON, DEFAULT_METALLICITY_COLUMN, DEFAULT_METALLICITY_SCALE,
    DEFAULT_MIN_LEVEL, DEFAULT_MIN_WAVELENGTH_MICRON, DEFAULT_NUM_PACKETS, DEFAULT_NUM_VIEWS,
    DEFAULT_NUM_WAVELENGTHS, DEFAULT_PIXELS, DEFAULT_POS_TO_KPC, DEFAULT_R_CUT_KPC,
    DEFAULT_SED_FAMILY, DEFAULT_SKI_INPUT_DIR, DEFAULT_SKI_NAME, DEFAULT_SKI_OUTPUT_DIR,
    DEFAULT_SNAPNUM, DEFAULT_SNAPSHOT_GLOB,
};
use crate::domain::{PrepError, PrepResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    pub ingest: IngestParameters,
    pub views: ViewParameters,
    pub camera: CameraParameters,
    pub assembly: AssemblyParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestParameters {
    pub snapshot_glob: String,
    pub host_coords: PathBuf,
    pub snapnum: u64,
    pub r_cut_kpc: f64,
    pub dust_to_metals: f64,
    pub pos_to_kpc: f64,
    /// Falls back to `pos_to_kpc` when unset.
    pub host_pos_to_kpc: Option<f64>,
    /// Falls back to the snapshot header's `UnitMassInG`, then to 1.
    pub mass_to_msun: Option<f64>,
    pub metallicity_scale: f64,
    pub metallicity_column: usize,
    pub hsml_fallback_kpc: f64,
}

impl Default for IngestParameters {
    fn default() -> Self {
        Self {
            snapshot_glob: DEFAULT_SNAPSHOT_GLOB.to_string(),
            host_coords: PathBuf::from(DEFAULT_HOST_COORDS),
            snapnum: DEFAULT_SNAPNUM,
            r_cut_kpc: DEFAULT_R_CUT_KPC,
            dust_to_metals: DEFAULT_DUST_TO_METALS,
            pos_to_kpc: DEFAULT_POS_TO_KPC,
            host_pos_to_kpc: None,
            mass_to_msun: None,
            metallicity_scale: DEFAULT_METALLICITY_SCALE,
            metallicity_column: DEFAULT_METALLICITY_COLUMN,
            hsml_fallback_kpc: DEFAULT_HSML_FALLBACK_KPC,
        }
    }
}

impl IngestParameters {
    pub fn effective_host_pos_to_kpc(&self) -> f64 {
        self.host_pos_to_kpc.unwrap_or(self.pos_to_kpc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewParameters {
    pub num_views: usize,
}

impl Default for ViewParameters {
    fn default() -> Self {
        Self {
            num_views: DEFAULT_NUM_VIEWS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParameters {
    /// Camera distance in Mpc, used by both camera derivation and assembly.
    pub distance_mpc: f64,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self {
            distance_mpc: DEFAULT_DISTANCE_MPC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyParameters {
    pub ski_name: String,
    /// Where the simulator should read the particle tables, relative to the run directory.
    pub input_dir: String,
    /// Where the simulator should write its images, relative to the run directory.
    pub output_dir: String,
    pub num_packets: f64,
    pub min_wavelength_micron: f64,
    pub max_wavelength_micron: f64,
    pub num_wavelengths: usize,
    pub pixels: usize,
    /// Square field of view; defaults to twice the ingestion cut radius.
    pub field_of_view_kpc: Option<f64>,
    pub min_level: u32,
    pub max_level: u32,
    pub max_dust_fraction: f64,
    /// Overrides the ratio recorded in the metadata record.
    pub dust_to_metals: Option<f64>,
    pub sed_family: String,
    pub bb_radius_km: f64,
    pub bb_temperature_k: f64,
}

impl Default for AssemblyParameters {
    fn default() -> Self {
        Self {
            ski_name: DEFAULT_SKI_NAME.to_string(),
            input_dir: DEFAULT_SKI_INPUT_DIR.to_string(),
            output_dir: DEFAULT_SKI_OUTPUT_DIR.to_string(),
            num_packets: DEFAULT_NUM_PACKETS,
            min_wavelength_micron: DEFAULT_MIN_WAVELENGTH_MICRON,
            max_wavelength_micron: DEFAULT_MAX_WAVELENGTH_MICRON,
            num_wavelengths: DEFAULT_NUM_WAVELENGTHS,
            pixels: DEFAULT_PIXELS,
            field_of_view_kpc: None,
            min_level: DEFAULT_MIN_LEVEL,
            max_level: DEFAULT_MAX_LEVEL,
            max_dust_fraction: DEFAULT_MAX_DUST_FRACTION,
            dust_to_metals: None,
            sed_family: DEFAULT_SED_FAMILY.to_string(),
            bb_radius_km: DEFAULT_BB_RADIUS_KM,
            bb_temperature_k: DEFAULT_BB_TEMPERATURE_K,
        }
    }
}

impl RunParameters {
    pub fn validate(&self) -> PrepResult<()> {
        let ingest = &self.ingest;
        require_positive("ingest.r_cut_kpc", ingest.r_cut_kpc)?;
        require_positive("ingest.pos_to_kpc", ingest.pos_to_kpc)?;
        require_positive("ingest.host_pos_to_kpc", ingest.effective_host_pos_to_kpc())?;
        if let Some(mass_to_msun) = ingest.mass_to_msun {
            require_positive("ingest.mass_to_msun", mass_to_msun)?;
        }
        if !ingest.dust_to_metals.is_finite() || !(0.0..=1.0).contains(&ingest.dust_to_metals) {
            return Err(invalid_parameter(format!(
                "ingest.dust_to_metals must lie in [0, 1], got {}",
                ingest.dust_to_metals
            )));
        }

        require_positive("camera.distance_mpc", self.camera.distance_mpc)?;

        let assembly = &self.assembly;
        require_positive("assembly.num_packets", assembly.num_packets)?;
        require_positive("assembly.min_wavelength_micron", assembly.min_wavelength_micron)?;
        if assembly.max_wavelength_micron <= assembly.min_wavelength_micron {
            return Err(invalid_parameter(format!(
                "assembly wavelength range [{}, {}] micron is empty",
                assembly.min_wavelength_micron, assembly.max_wavelength_micron
            )));
        }
        if assembly.num_wavelengths == 0 || assembly.pixels == 0 {
            return Err(invalid_parameter(
                "assembly.num_wavelengths and assembly.pixels must be positive",
            ));
        }
        if assembly.min_level > assembly.max_level {
            return Err(invalid_parameter(format!(
                "assembly.min_level {} exceeds assembly.max_level {}",
                assembly.min_level, assembly.max_level
            )));
        }
        require_positive("assembly.max_dust_fraction", assembly.max_dust_fraction)?;
        if let Some(fov) = assembly.field_of_view_kpc {
            require_positive("assembly.field_of_view_kpc", fov)?;
        }
        require_declarable_dir("assembly.input_dir", &assembly.input_dir)?;
        require_declarable_dir("assembly.output_dir", &assembly.output_dir)?;
        if let Some(ratio) = assembly.dust_to_metals {
            if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
                return Err(invalid_parameter(format!(
                    "assembly.dust_to_metals must lie in [0, 1], got {}",
                    ratio
                )));
            }
        }
        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> PrepResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid_parameter(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )))
    }
}

/// Directories are declared inside an XML comment, which cannot hold `--`.
fn require_declarable_dir(name: &str, value: &str) -> PrepResult<()> {
    if value.trim().is_empty() || value.contains("--") {
        return Err(invalid_parameter(format!(
            "{} must be a non-empty path without '--', got '{}'",
            name, value
        )));
    }
    Ok(())
}

fn invalid_parameter(message: impl Into<String>) -> PrepError {
    PrepError::schema("INPUT.RUN_PARAMETERS", message)
}

#[derive(Debug, thiserror::Error)]
pub enum RunParametersError {
    #[error("failed to read run parameters '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse run parameters '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<RunParametersError> for PrepError {
    fn from(error: RunParametersError) -> Self {
        match &error {
            RunParametersError::Read { .. } => {
                PrepError::resource_resolution("INPUT.RUN_PARAMETERS_FILE", error.to_string())
            }
            RunParametersError::Parse { .. } => {
                PrepError::schema("INPUT.RUN_PARAMETERS_FILE", error.to_string())
            }
        }
    }
}

pub fn load_run_parameters(
    path: impl AsRef<Path>,
) -> Result<RunParameters, RunParametersError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| RunParametersError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| RunParametersError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{RunParameters, RunParametersError, load_run_parameters};
    use crate::domain::PrepErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid_and_fully_populated() {
        let params = RunParameters::default();
        params.validate().expect("defaults should validate");
        assert_eq!(params.views.num_views, 32);
        assert_eq!(params.camera.distance_mpc, 10.0);
        assert_eq!(params.ingest.metallicity_column, 0);
        assert_eq!(params.ingest.effective_host_pos_to_kpc(), 1.0);
        assert_eq!(params.assembly.sed_family, "BruzualCharlotSEDFamily");
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_knobs() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("run.json");
        fs::write(
            &path,
            r#"{ "camera": { "distance_mpc": 3.5 }, "ingest": { "pos_to_kpc": 0.7 } }"#,
        )
        .expect("params should be written");

        let params = load_run_parameters(&path).expect("params should load");
        assert_eq!(params.camera.distance_mpc, 3.5);
        assert_eq!(params.ingest.pos_to_kpc, 0.7);
        assert_eq!(params.ingest.effective_host_pos_to_kpc(), 0.7);
        assert_eq!(params.ingest.r_cut_kpc, 60.0);
        assert_eq!(params.assembly.pixels, 256);
    }

    #[test]
    fn invalid_knobs_are_rejected_as_schema_errors() {
        let mut params = RunParameters::default();
        params.camera.distance_mpc = 0.0;
        let error = params.validate().expect_err("zero distance should fail");
        assert_eq!(error.category(), PrepErrorCategory::SchemaError);
        assert_eq!(error.placeholder(), "INPUT.RUN_PARAMETERS");

        let mut params = RunParameters::default();
        params.assembly.min_level = 7;
        assert!(params.validate().is_err());

        for dir in ["", "out--put"] {
            let mut params = RunParameters::default();
            params.assembly.output_dir = dir.to_string();
            let error = params.validate().expect_err("undeclarable output dir");
            assert!(error.message().contains("assembly.output_dir"), "{dir}");
        }
    }

    #[test]
    fn unreadable_and_malformed_files_map_to_distinct_categories() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = temp.path().join("missing.json");
        let error = load_run_parameters(&missing).expect_err("missing file should fail");
        assert!(matches!(error, RunParametersError::Read { .. }));
        let error: crate::domain::PrepError = error.into();
        assert_eq!(
            error.category(),
            PrepErrorCategory::ResourceResolutionError
        );

        let malformed = temp.path().join("bad.json");
        fs::write(&malformed, "{ not json").expect("file should be written");
        let error: crate::domain::PrepError = load_run_parameters(&malformed)
            .expect_err("malformed file should fail")
            .into();
        assert_eq!(error.category(), PrepErrorCategory::SchemaError);
    }
}
