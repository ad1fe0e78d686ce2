mod consistency;
mod postrun;
mod prerun;

use super::assembly::ConfigurationDocument;
use super::{StageExecutor, ValidationExecutor};
use crate::common::RunParameters;
use crate::domain::{PrepResult, StageArtifact, StageRequest, ValidationResult};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub use consistency::{ConsistencyReport, check_consistency};
pub use postrun::{InstrumentOutput, PostRunReport, check_outputs, image_pattern};
pub use prerun::{PreRunReport, TableSummary, check_inputs, check_table};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreRunCheckModule;

impl ValidationExecutor for PreRunCheckModule {
    type Report = PreRunReport;

    fn validate(
        &self,
        request: &StageRequest,
        _params: &RunParameters,
    ) -> ValidationResult<PreRunReport> {
        let report = check_inputs(&request.run_dir)?;
        for warning in &report.warnings {
            warn!("{warning}");
        }
        info!(
            stars = report.stars.rows,
            gas = report.gas.rows,
            warnings = report.warnings.len(),
            "particle tables passed pre-run checks"
        );
        Ok(report)
    }
}

impl StageExecutor for PreRunCheckModule {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>> {
        self.validate(request, params).map(|_| Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsistencyCheckModule;

impl ValidationExecutor for ConsistencyCheckModule {
    type Report = ConsistencyReport;

    fn validate(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> ValidationResult<ConsistencyReport> {
        let report = check_consistency(&request.run_dir, params)?;
        info!(
            num_views = report.num_views,
            distance_mpc = report.distance_mpc,
            "view count and camera distance agree across artifacts"
        );
        Ok(report)
    }
}

impl StageExecutor for ConsistencyCheckModule {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>> {
        self.validate(request, params).map(|_| Vec::new())
    }
}

/// Post-run image check. Missing images are only fatal when `strict` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRunCheckModule {
    /// Directory holding the simulator's images. Defaults to the output
    /// directory declared in the `.ski`, resolved against the run directory.
    pub output_dir: Option<PathBuf>,
    pub strict: bool,
}

impl ValidationExecutor for PostRunCheckModule {
    type Report = PostRunReport;

    fn validate(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> ValidationResult<PostRunReport> {
        let document =
            ConfigurationDocument::read(&request.artifact_path(&params.assembly.ski_name))?;
        let output_dir = match (&self.output_dir, &document.output_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(declared)) => request.run_dir.join(declared),
            (None, None) => request.run_dir.clone(),
        };
        debug!(output_dir = %output_dir.display(), "looking for simulator images");
        let report = check_outputs(&document, &output_dir)?;
        if report.is_complete() {
            info!(
                instruments = report.instruments.len(),
                "found images for every instrument"
            );
        } else {
            warn!(
                missing = report.missing.len(),
                instruments = report.instruments.len(),
                "simulator outputs are incomplete"
            );
        }
        if self.strict {
            if let Some(error) = report.missing_error() {
                return Err(error);
            }
        }
        Ok(report)
    }
}

impl StageExecutor for PostRunCheckModule {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>> {
        self.validate(request, params).map(|_| Vec::new())
    }
}
