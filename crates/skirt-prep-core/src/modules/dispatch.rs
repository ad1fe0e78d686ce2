use super::assembly::AssemblyModule;
use super::camera::CameraPositionModule;
use super::snapshot::SnapshotIngestModule;
use super::traits::{StageExecutor, ValidationExecutor};
use super::validation::{ConsistencyCheckModule, PostRunCheckModule, PreRunCheckModule};
use super::views::ViewSetModule;
use crate::common::RunParameters;
use crate::domain::{PipelineStage, PrepError, PrepResult, StageArtifact, StageRequest};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Per-invocation settings that are not physical knobs and so live outside [`RunParameters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOptions {
    /// Producer timestamp written into the `.ski` root element.
    pub timestamp: Option<String>,
    /// Where the simulator wrote its images; defaults to the run directory.
    pub output_dir: Option<PathBuf>,
    /// Treat missing simulator images as an error.
    pub strict: bool,
}

pub fn execute_stage(
    stage: PipelineStage,
    request: &StageRequest,
    params: &RunParameters,
    options: &StageOptions,
) -> PrepResult<Vec<StageArtifact>> {
    prepare_dispatch(stage, request, params)?;

    match stage {
        PipelineStage::Ingest => {
            let module: SnapshotIngestModule = SnapshotIngestModule::default();
            module.execute(request, params)
        }
        PipelineStage::Views => ViewSetModule.execute(request, params),
        PipelineStage::Cameras => CameraPositionModule.execute(request, params),
        PipelineStage::Assemble => {
            AssemblyModule::with_timestamp(options.timestamp.clone()).execute(request, params)
        }
        PipelineStage::CheckInputs
        | PipelineStage::CheckConsistency
        | PipelineStage::CheckOutputs => {
            dispatch_check(stage, request, params, options).map(|_| Vec::new())
        }
    }
}

/// Runs a check stage and returns its report as JSON.
///
/// Non-check stages are rejected; they have no report to return.
pub fn execute_check(
    stage: PipelineStage,
    request: &StageRequest,
    params: &RunParameters,
    options: &StageOptions,
) -> PrepResult<Value> {
    prepare_dispatch(stage, request, params)?;
    dispatch_check(stage, request, params, options)
}

fn prepare_dispatch(
    stage: PipelineStage,
    request: &StageRequest,
    params: &RunParameters,
) -> PrepResult<()> {
    if request.stage != stage {
        return Err(PrepError::internal(
            "RUN.STAGE_MISMATCH",
            format!(
                "stage dispatcher received stage {} for request stage {}",
                stage, request.stage
            ),
        ));
    }
    params.validate()?;
    debug!(stage = %stage, run_dir = %request.run_dir.display(), "dispatching stage");
    Ok(())
}

fn dispatch_check(
    stage: PipelineStage,
    request: &StageRequest,
    params: &RunParameters,
    options: &StageOptions,
) -> PrepResult<Value> {
    match stage {
        PipelineStage::CheckInputs => {
            report_value(stage, &PreRunCheckModule.validate(request, params)?)
        }
        PipelineStage::CheckConsistency => {
            report_value(stage, &ConsistencyCheckModule.validate(request, params)?)
        }
        PipelineStage::CheckOutputs => {
            let check = PostRunCheckModule {
                output_dir: options.output_dir.clone(),
                strict: options.strict,
            };
            report_value(stage, &check.validate(request, params)?)
        }
        _ => Err(PrepError::internal(
            "RUN.STAGE_NOT_A_CHECK",
            format!("{} is not a check stage and has no report", stage),
        )),
    }
}

fn report_value<T: Serialize>(stage: PipelineStage, report: &T) -> PrepResult<Value> {
    serde_json::to_value(report).map_err(|error| {
        PrepError::internal(
            "SYS.JSON_ENCODE",
            format!("failed to encode {} report: {}", stage, error),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{StageOptions, execute_check, execute_stage};
    use crate::common::RunParameters;
    use crate::domain::{PipelineStage, PrepErrorCategory, StageRequest};
    use std::fs;
    use tempfile::TempDir;

    const SKI: &str = r#"<instruments>
<FrameInstrument instrumentName="view_000" distance="10.0 Mpc"/>
<FrameInstrument instrumentName="view_001" distance="10.0 Mpc"/>
</instruments>"#;

    #[test]
    fn dispatcher_rejects_mismatched_stage_requests() {
        let request = StageRequest::new(PipelineStage::Views, "run");
        let error = execute_stage(
            PipelineStage::Cameras,
            &request,
            &RunParameters::default(),
            &StageOptions::default(),
        )
        .expect_err("mismatch should fail");
        assert_eq!(error.category(), PrepErrorCategory::InternalError);
    }

    #[test]
    fn dispatcher_validates_parameters_before_running() {
        let temp = TempDir::new().expect("tempdir should be created");
        let request = StageRequest::new(PipelineStage::Views, temp.path());
        let mut params = RunParameters::default();
        params.camera.distance_mpc = -1.0;
        let error = execute_stage(PipelineStage::Views, &request, &params, &StageOptions::default())
            .expect_err("invalid parameters");
        assert_eq!(error.category(), PrepErrorCategory::SchemaError);
        assert!(!temp.path().join("views.json").exists());
    }

    #[test]
    fn views_then_cameras_run_through_the_dispatcher() {
        let temp = TempDir::new().expect("tempdir should be created");
        let params = RunParameters::default();
        for stage in [PipelineStage::Views, PipelineStage::Cameras] {
            let artifacts = execute_stage(
                stage,
                &StageRequest::new(stage, temp.path()),
                &params,
                &StageOptions::default(),
            )
            .expect("stage should succeed");
            assert_eq!(artifacts.len(), 1);
            assert!(temp.path().join(&artifacts[0].relative_path).is_file());
        }
    }

    #[test]
    fn check_options_reach_the_post_run_check() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::write(temp.path().join("simulation.ski"), SKI).expect("ski should be written");
        let images = temp.path().join("images");
        fs::create_dir(&images).expect("image dir should be created");
        fs::write(images.join("simulation_view_000_total.fits"), b"").expect("image");

        let request = StageRequest::new(PipelineStage::CheckOutputs, temp.path());
        let params = RunParameters::default();
        let lenient = StageOptions {
            output_dir: Some(images.clone()),
            ..StageOptions::default()
        };
        let report = execute_check(PipelineStage::CheckOutputs, &request, &params, &lenient)
            .expect("lenient check passes");
        assert_eq!(report["missing"], serde_json::json!(["view_001"]));

        let strict = StageOptions {
            output_dir: Some(images),
            strict: true,
            ..StageOptions::default()
        };
        let error = execute_check(PipelineStage::CheckOutputs, &request, &params, &strict)
            .expect_err("strict check fails");
        assert_eq!(error.category(), PrepErrorCategory::ArtifactMissingError);
        let error = execute_stage(PipelineStage::CheckOutputs, &request, &params, &strict)
            .expect_err("stage dispatch honours strict too");
        assert_eq!(error.exit_code(), 6);
    }

    #[test]
    fn producing_stages_have_no_check_report() {
        let request = StageRequest::new(PipelineStage::Views, "run");
        let error = execute_check(
            PipelineStage::Views,
            &request,
            &RunParameters::default(),
            &StageOptions::default(),
        )
        .expect_err("views is not a check");
        assert_eq!(error.category(), PrepErrorCategory::InternalError);
        assert!(error.message().contains("not a check stage"));
    }
}
