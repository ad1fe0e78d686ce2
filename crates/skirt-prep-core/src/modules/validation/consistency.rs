use crate::common::RunParameters;
use crate::common::constants::KPC_PER_MPC;
use crate::domain::{PrepError, ValidationResult, instrument_name_for_index};
use crate::modules::assembly::ConfigurationDocument;
use crate::modules::camera::{CAMERA_TABLE, read_camera_table};
use crate::modules::views::{VIEW_SET_DOCUMENT, read_view_set};
use crate::numerics::norm3;
use serde::Serialize;
use std::path::Path;

const DISTANCE_UNIT: &str = "Mpc";
/// Relative slack for values read back from fixed-precision text.
const TEXT_TOLERANCE: f64 = 1.0e-6;
/// Unit-vector components are written with 8 decimals.
const DIRECTION_TOLERANCE: f64 = 1.0e-7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub num_views: usize,
    pub distance_mpc: f64,
    pub artifacts_checked: Vec<String>,
}

/// Re-derives the view count and camera distance from the run parameters and
/// compares them with `views.json`, the camera table and the `.ski` instruments.
pub fn check_consistency(
    run_dir: &Path,
    params: &RunParameters,
) -> ValidationResult<ConsistencyReport> {
    let expected_views = params.views.num_views;
    let distance_mpc = params.camera.distance_mpc;

    let views = read_view_set(&run_dir.join(VIEW_SET_DOCUMENT))?;
    if views.len() != expected_views {
        return Err(mismatch(format!(
            "{} lists {} views but the run expects {}",
            VIEW_SET_DOCUMENT,
            views.len(),
            expected_views
        )));
    }

    // Positions are rounded in absolute terms, so their slack grows with D.
    let position_slack = TEXT_TOLERANCE * distance_mpc.max(1.0);
    let cameras = read_camera_table(&run_dir.join(CAMERA_TABLE))?;
    if cameras.len() != expected_views {
        return Err(mismatch(format!(
            "{} has {} rows but the run expects {} views",
            CAMERA_TABLE,
            cameras.len(),
            expected_views
        )));
    }
    for (camera, view) in cameras.iter().zip(views.iter()) {
        if camera.index != view.index {
            return Err(mismatch(format!(
                "{} row for view {} carries index {}",
                CAMERA_TABLE, view.index, camera.index
            )));
        }
        let radius = norm3(camera.native);
        if !close(radius, distance_mpc) {
            return Err(mismatch(format!(
                "camera {} sits at {} Mpc but the run distance is {} Mpc",
                camera.index, radius, distance_mpc
            )));
        }
        let drift = (0..3).any(|axis| {
            (camera.dir[axis] - view.dir[axis]).abs() > DIRECTION_TOLERANCE
                || (camera.native[axis] - view.dir[axis] * distance_mpc).abs() > position_slack
                || (camera.sub[axis] / KPC_PER_MPC - camera.native[axis]).abs() > position_slack
        });
        if drift {
            return Err(mismatch(format!(
                "camera {} does not match its view direction at {} Mpc",
                camera.index, distance_mpc
            )));
        }
    }

    let ski_name = params.assembly.ski_name.as_str();
    let document = ConfigurationDocument::read(&run_dir.join(ski_name))?;
    if document.instruments.len() != expected_views {
        return Err(mismatch(format!(
            "{} declares {} instruments but the run expects {}",
            ski_name,
            document.instruments.len(),
            expected_views
        )));
    }
    for (index, instrument) in document.instruments.iter().enumerate() {
        let expected_name = instrument_name_for_index(index);
        if instrument.name != expected_name {
            return Err(mismatch(format!(
                "instrument #{} in {} is named '{}', expected '{}'",
                index, ski_name, instrument.name, expected_name
            )));
        }
        if instrument.distance_unit != DISTANCE_UNIT || !close(instrument.distance, distance_mpc) {
            return Err(mismatch(format!(
                "instrument '{}' is placed at {} {} but cameras use {} {}",
                instrument.name,
                instrument.distance,
                instrument.distance_unit,
                distance_mpc,
                DISTANCE_UNIT
            )));
        }
    }

    Ok(ConsistencyReport {
        num_views: expected_views,
        distance_mpc,
        artifacts_checked: vec![
            VIEW_SET_DOCUMENT.to_string(),
            CAMERA_TABLE.to_string(),
            ski_name.to_string(),
        ],
    })
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= TEXT_TOLERANCE * expected.abs().max(1.0)
}

fn mismatch(message: String) -> PrepError {
    PrepError::consistency("CHECK.CROSS_ARTIFACT", message)
}

#[cfg(test)]
mod tests {
    use super::check_consistency;
    use crate::common::RunParameters;
    use crate::domain::{PipelineStage, PrepErrorCategory, StageRequest};
    use crate::modules::StageExecutor;
    use crate::modules::assembly::AssemblyModule;
    use crate::modules::camera::CameraPositionModule;
    use crate::modules::views::ViewSetModule;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const META: &str = r#"{
        "r_cut_kpc": 60.0, "dust_to_metals": 0.4, "pos_to_kpc": 1.0, "host_pos_to_kpc": 1.0,
        "mass_to_msun": 1.0, "metallicity_scale": 1.0, "metallicity_column": 0,
        "counts": {"stars_total": 0, "stars_kept": 0, "gas_total": 0, "gas_kept": 0}
    }"#;

    fn build(run_dir: &Path, params: &RunParameters) {
        fs::write(run_dir.join("meta.json"), META).expect("meta should be written");
        ViewSetModule
            .execute(&StageRequest::new(PipelineStage::Views, run_dir), params)
            .expect("views");
        CameraPositionModule
            .execute(&StageRequest::new(PipelineStage::Cameras, run_dir), params)
            .expect("cameras");
        AssemblyModule::default()
            .execute(&StageRequest::new(PipelineStage::Assemble, run_dir), params)
            .expect("assembly");
    }

    fn params(num_views: usize, distance_mpc: f64) -> RunParameters {
        let mut params = RunParameters::default();
        params.views.num_views = num_views;
        params.camera.distance_mpc = distance_mpc;
        params
    }

    #[test]
    fn artifacts_from_one_parameter_set_agree() {
        let temp = TempDir::new().expect("tempdir should be created");
        build(temp.path(), &params(6, 12.5));
        let report = check_consistency(temp.path(), &params(6, 12.5)).expect("consistent run");
        assert_eq!(report.num_views, 6);
        assert_eq!(report.artifacts_checked.len(), 3);
    }

    #[test]
    fn a_changed_distance_is_detected() {
        let temp = TempDir::new().expect("tempdir should be created");
        build(temp.path(), &params(4, 10.0));
        let error = check_consistency(temp.path(), &params(4, 20.0)).expect_err("distance drift");
        assert_eq!(error.category(), PrepErrorCategory::ConsistencyError);
        assert!(error.message().contains("20"));
    }

    #[test]
    fn a_ski_from_a_different_run_is_detected() {
        let temp = TempDir::new().expect("tempdir should be created");
        build(temp.path(), &params(4, 10.0));

        let other = TempDir::new().expect("tempdir should be created");
        build(other.path(), &params(4, 15.0));
        fs::copy(
            other.path().join("simulation.ski"),
            temp.path().join("simulation.ski"),
        )
        .expect("ski should be copied");

        let error = check_consistency(temp.path(), &params(4, 10.0)).expect_err("ski drift");
        assert_eq!(error.category(), PrepErrorCategory::ConsistencyError);
        assert!(error.message().contains("view_000"));
    }

    #[test]
    fn rounding_in_the_camera_table_is_tolerated_at_large_distances() {
        let temp = TempDir::new().expect("tempdir should be created");
        build(temp.path(), &params(1000, 12_345.678));
        let report =
            check_consistency(temp.path(), &params(1000, 12_345.678)).expect("consistent run");
        assert_eq!(report.num_views, 1000);
    }

    #[test]
    fn an_edited_camera_direction_is_detected() {
        let temp = TempDir::new().expect("tempdir should be created");
        build(temp.path(), &params(4, 10.0));
        let table_path = temp.path().join("camera_positions.txt");
        let table = fs::read_to_string(&table_path).expect("camera table should exist");
        let mut lines: Vec<String> = table.lines().map(str::to_string).collect();
        let row = lines
            .iter()
            .position(|line| !line.starts_with('#'))
            .expect("table should have rows");
        let mut fields: Vec<String> = lines[row].split_whitespace().map(str::to_string).collect();
        let x: f64 = fields[3].parse().expect("dir x should parse");
        fields[3] = format!("{:.8}", x + 1.0e-3);
        lines[row] = fields.join(" ");
        fs::write(&table_path, lines.join("\n") + "\n").expect("table should be rewritten");

        let error = check_consistency(temp.path(), &params(4, 10.0)).expect_err("direction drift");
        assert_eq!(error.category(), PrepErrorCategory::ConsistencyError);
        assert!(error.message().contains("camera 0"));
    }

    #[test]
    fn a_changed_view_count_is_detected() {
        let temp = TempDir::new().expect("tempdir should be created");
        build(temp.path(), &params(4, 10.0));
        let error = check_consistency(temp.path(), &params(5, 10.0)).expect_err("count drift");
        assert_eq!(error.category(), PrepErrorCategory::ConsistencyError);
    }
}
