use skirt_prep_core::domain::PipelineStage;

#[derive(Debug, Clone, Copy)]
pub(super) struct StageCommandSpec {
    pub(super) command: &'static str,
    pub(super) stage: PipelineStage,
    /// Artifact the stage cannot run without, relative to the run directory.
    pub(super) input_artifact: Option<&'static str>,
}

pub(super) const STAGE_COMMANDS: [StageCommandSpec; 7] = [
    StageCommandSpec {
        command: "ingest",
        stage: PipelineStage::Ingest,
        input_artifact: None,
    },
    StageCommandSpec {
        command: "views",
        stage: PipelineStage::Views,
        input_artifact: None,
    },
    StageCommandSpec {
        command: "cameras",
        stage: PipelineStage::Cameras,
        input_artifact: Some("views.json"),
    },
    StageCommandSpec {
        command: "assemble",
        stage: PipelineStage::Assemble,
        input_artifact: Some("meta.json"),
    },
    StageCommandSpec {
        command: "check-inputs",
        stage: PipelineStage::CheckInputs,
        input_artifact: Some("meta.json"),
    },
    StageCommandSpec {
        command: "check-consistency",
        stage: PipelineStage::CheckConsistency,
        input_artifact: Some("views.json"),
    },
    StageCommandSpec {
        command: "check-outputs",
        stage: PipelineStage::CheckOutputs,
        input_artifact: None,
    },
];

/// Stages `prepare` runs, in order; the post-run check needs simulator output.
pub(super) const PREPARE_CHAIN: [PipelineStage; 6] = [
    PipelineStage::Ingest,
    PipelineStage::Views,
    PipelineStage::Cameras,
    PipelineStage::Assemble,
    PipelineStage::CheckInputs,
    PipelineStage::CheckConsistency,
];

pub(super) fn stage_command_for(stage: PipelineStage) -> Option<StageCommandSpec> {
    STAGE_COMMANDS
        .iter()
        .copied()
        .find(|spec| spec.stage == stage)
}
