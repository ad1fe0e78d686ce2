mod model;
mod parser;

use super::StageExecutor;
use super::serialization::{ensure_output_dir, write_error, write_text_artifact};
use super::views::{VIEW_SET_DOCUMENT, read_view_set};
use crate::common::RunParameters;
use crate::domain::{PrepResult, StageArtifact, StageRequest};
use tracing::info;

pub use model::{CAMERA_TABLE_HEADER, CameraPosition, derive_camera_positions, render_camera_table};
pub use parser::read_camera_table;

pub const CAMERA_TABLE: &str = "camera_positions.txt";

/// Derives observer positions from `views.json` at `camera.distance_mpc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraPositionModule;

impl StageExecutor for CameraPositionModule {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>> {
        let views = read_view_set(&request.artifact_path(VIEW_SET_DOCUMENT))?;
        let distance_mpc = params.camera.distance_mpc;
        let positions = derive_camera_positions(&views, distance_mpc)?;

        ensure_output_dir(&request.run_dir)?;
        let path = request.artifact_path(CAMERA_TABLE);
        write_text_artifact(&path, &render_camera_table(&positions))
            .map_err(|source| write_error(&path, source))?;
        info!(
            cameras = positions.len(),
            distance_mpc,
            path = %path.display(),
            "wrote camera positions"
        );
        Ok(vec![StageArtifact::new(CAMERA_TABLE)])
    }
}
