mod model;

use super::StageExecutor;
use super::serialization::{ensure_output_dir, read_json_artifact, write_json_artifact};
use crate::common::RunParameters;
use crate::domain::{PrepResult, StageArtifact, StageRequest, ViewSet};
use std::path::Path;
use tracing::info;

pub use model::{FIBONACCI_METHOD, generate_view_set, validate_view_set};

pub const VIEW_SET_DOCUMENT: &str = "views.json";

/// Loads `views.json` and checks its indices and direction norms.
pub fn read_view_set(path: &Path) -> PrepResult<ViewSet> {
    let views: ViewSet = read_json_artifact(path, "INPUT.VIEW_SET")?;
    validate_view_set(&views)?;
    Ok(views)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSetModule;

impl StageExecutor for ViewSetModule {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>> {
        let views = generate_view_set(params.views.num_views)?;
        ensure_output_dir(&request.run_dir)?;
        let path = request.artifact_path(VIEW_SET_DOCUMENT);
        write_json_artifact(&path, &views)?;
        info!(
            num_views = views.len(),
            path = %path.display(),
            "wrote view set"
        );
        Ok(vec![StageArtifact::new(VIEW_SET_DOCUMENT)])
    }
}

#[cfg(test)]
mod tests {
    use super::{ViewSetModule, read_view_set};
    use crate::common::RunParameters;
    use crate::domain::{PipelineStage, PrepErrorCategory, StageRequest};
    use crate::modules::StageExecutor;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn module_writes_a_view_set_that_reads_back() {
        let temp = TempDir::new().expect("tempdir should be created");
        let request = StageRequest::new(PipelineStage::Views, temp.path());
        let mut params = RunParameters::default();
        params.views.num_views = 6;

        let artifacts = ViewSetModule
            .execute(&request, &params)
            .expect("views stage should succeed");
        assert_eq!(artifacts.len(), 1);

        let views = read_view_set(&temp.path().join("views.json")).expect("views should load");
        assert_eq!(views.len(), 6);
        assert_eq!(views.method, "fibonacci_sphere");

        let text = fs::read_to_string(temp.path().join("views.json")).expect("json");
        let raw: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(raw["num_views"], 6);
        assert_eq!(raw["views"][5]["index"], 5);
    }

    #[test]
    fn missing_view_set_is_a_resource_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = read_view_set(&temp.path().join("views.json")).expect_err("missing file");
        assert_eq!(error.category(), PrepErrorCategory::ResourceResolutionError);
    }
}
