pub mod config;
pub mod constants;
pub mod cosmology;

pub use config::{
    AssemblyParameters, CameraParameters, IngestParameters, RunParameters, RunParametersError,
    ViewParameters, load_run_parameters,
};
pub use cosmology::Cosmology;
