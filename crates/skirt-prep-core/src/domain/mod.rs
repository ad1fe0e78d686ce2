pub mod errors;
mod particles;
mod views;

pub use errors::{
    AssemblyResult, ExitStatusMapping, IngestResult, PrepError, PrepErrorCategory, PrepResult,
    ValidationResult,
};
pub use particles::{
    GAS_TABLE_COLUMNS, GasParticle, MetaRecord, ParticleCounts, STELLAR_TABLE_COLUMNS,
    StellarParticle, TableColumn,
};
pub use views::{ViewDirection, ViewSet};
pub(crate) use views::instrument_name_for_index;

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Ingest,
    Views,
    Cameras,
    Assemble,
    CheckInputs,
    CheckConsistency,
    CheckOutputs,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ingest => "INGEST",
            Self::Views => "VIEWS",
            Self::Cameras => "CAMERAS",
            Self::Assemble => "ASSEMBLE",
            Self::CheckInputs => "CHECK-INPUTS",
            Self::CheckConsistency => "CHECK-CONSISTENCY",
            Self::CheckOutputs => "CHECK-OUTPUTS",
        }
    }

    /// Validation stages only read artifacts; they never write into the run directory.
    pub const fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::CheckInputs | Self::CheckConsistency | Self::CheckOutputs
        )
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRequest {
    pub stage: PipelineStage,
    pub run_dir: PathBuf,
}

impl StageRequest {
    pub fn new(stage: PipelineStage, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            run_dir: run_dir.into(),
        }
    }

    pub fn artifact_path(&self, relative_path: &str) -> PathBuf {
        self.run_dir.join(relative_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageArtifact {
    pub relative_path: PathBuf,
}

impl StageArtifact {
    pub fn new(relative_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineStage, StageArtifact, StageRequest};
    use std::path::PathBuf;

    #[test]
    fn stage_request_resolves_artifacts_inside_run_dir() {
        let request = StageRequest::new(PipelineStage::Ingest, "run");
        assert_eq!(request.artifact_path("meta.json"), PathBuf::from("run/meta.json"));
        assert_eq!(request.stage.to_string(), "INGEST");
    }

    #[test]
    fn only_check_stages_are_read_only() {
        assert!(!PipelineStage::Ingest.is_read_only());
        assert!(!PipelineStage::Assemble.is_read_only());
        assert!(PipelineStage::CheckInputs.is_read_only());
        assert!(PipelineStage::CheckOutputs.is_read_only());
        assert_eq!(
            StageArtifact::new("views.json").relative_path,
            PathBuf::from("views.json")
        );
    }
}
