use crate::common::RunParameters;
use crate::domain::{PrepResult, StageArtifact, StageRequest, ValidationResult};
use serde::Serialize;

/// One pipeline stage: reads its inputs from the run directory and writes new artifacts.
pub trait StageExecutor {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>>;
}

/// A read-only check over the run directory that produces a report instead of artifacts.
pub trait ValidationExecutor {
    type Report: Serialize;

    fn validate(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> ValidationResult<Self::Report>;
}

#[cfg(test)]
mod tests {
    use super::{StageExecutor, ValidationExecutor};
    use crate::common::RunParameters;
    use crate::domain::{
        PipelineStage, PrepError, PrepErrorCategory, PrepResult, StageArtifact, StageRequest,
        ValidationResult,
    };

    struct FailingStage;

    impl StageExecutor for FailingStage {
        fn execute(
            &self,
            _request: &StageRequest,
            _params: &RunParameters,
        ) -> PrepResult<Vec<StageArtifact>> {
            Err(PrepError::empty_result(
                "RUN.STAGE",
                "stage produced no rows",
            ))
        }
    }

    struct CountingCheck;

    impl ValidationExecutor for CountingCheck {
        type Report = usize;

        fn validate(
            &self,
            _request: &StageRequest,
            params: &RunParameters,
        ) -> ValidationResult<usize> {
            Ok(params.views.num_views)
        }
    }

    #[test]
    fn validation_executor_returns_a_serializable_report() {
        let request = StageRequest::new(PipelineStage::CheckInputs, "run");
        let report = CountingCheck
            .validate(&request, &RunParameters::default())
            .expect("check should pass");
        assert_eq!(serde_json::to_string(&report).expect("json"), "32");
    }

    #[test]
    fn stage_executor_uses_shared_error_types() {
        let request = StageRequest::new(PipelineStage::Ingest, "run");
        let error = FailingStage
            .execute(&request, &RunParameters::default())
            .expect_err("stage should fail");
        assert_eq!(error.category(), PrepErrorCategory::EmptyResultError);
        assert_eq!(error.exit_code(), 4);
        assert_eq!(error.placeholder(), "RUN.STAGE");
    }
}
