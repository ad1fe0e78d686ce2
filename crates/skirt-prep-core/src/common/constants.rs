//! Unit conversion factors and pipeline defaults.
//!
//! Every stage reads its fallback values from here so that ingestion,
//! camera derivation and assembly never carry their own literals.

pub const CM_PER_KPC: f64 = 3.085_677_581e21;
pub const G_PER_MSUN: f64 = 1.988_47e33;
pub const SEC_PER_GYR: f64 = 3.155_76e16;
pub const KM_PER_MPC: f64 = 3.085_677_581e19;
pub const KPC_PER_MPC: f64 = 1000.0;

pub const DEFAULT_SNAPSHOT_GLOB: &str = "data/output/snapshot_600.*.json";
pub const DEFAULT_HOST_COORDS: &str = "data/track/host_coordinates.json";
pub const DEFAULT_RUN_DIR: &str = "run";
pub const DEFAULT_SNAPNUM: u64 = 600;
pub const DEFAULT_R_CUT_KPC: f64 = 60.0;
pub const DEFAULT_DUST_TO_METALS: f64 = 0.4;
pub const DEFAULT_POS_TO_KPC: f64 = 1.0;
pub const DEFAULT_METALLICITY_SCALE: f64 = 1.0;
pub const DEFAULT_METALLICITY_COLUMN: usize = 0;
pub const DEFAULT_HSML_FALLBACK_KPC: f64 = 0.5;

pub const DEFAULT_NUM_VIEWS: usize = 32;
pub const DEFAULT_DISTANCE_MPC: f64 = 10.0;

pub const DEFAULT_SKI_NAME: &str = "simulation.ski";
/// Simulator input and output directories declared in the `.ski`, relative to the run directory.
pub const DEFAULT_SKI_INPUT_DIR: &str = ".";
pub const DEFAULT_SKI_OUTPUT_DIR: &str = ".";
pub const DEFAULT_NUM_PACKETS: f64 = 2.0e5;
pub const DEFAULT_MIN_WAVELENGTH_MICRON: f64 = 0.09;
pub const DEFAULT_MAX_WAVELENGTH_MICRON: f64 = 100.0;
pub const DEFAULT_NUM_WAVELENGTHS: usize = 200;
pub const DEFAULT_PIXELS: usize = 256;
pub const DEFAULT_MIN_LEVEL: u32 = 2;
pub const DEFAULT_MAX_LEVEL: u32 = 6;
pub const DEFAULT_MAX_DUST_FRACTION: f64 = 1.0e-5;
pub const DEFAULT_SED_FAMILY: &str = "BruzualCharlotSEDFamily";
pub const DEFAULT_BB_RADIUS_KM: f64 = 6.96e5;
pub const DEFAULT_BB_TEMPERATURE_K: f64 = 5000.0;

/// Metallicity mass fractions above this are flagged by the pre-run checks.
pub const METALLICITY_WARNING_MAX: f64 = 0.1;
/// Coordinate medians further than this from the origin suggest a centering error.
pub const CENTERING_WARNING_KPC: f64 = 1.0;
