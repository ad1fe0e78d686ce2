use super::CliError;
use super::GlobalArgs;
use anyhow::Context;
use serde::Serialize;
use skirt_prep_core::common::{RunParameters, load_run_parameters};
use skirt_prep_core::domain::{PipelineStage, PrepError, StageArtifact, StageRequest};
use skirt_prep_core::modules::{StageOptions, execute_stage};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Defaults, then the `--params` file when one is given.
pub(super) fn load_parameters(global: &GlobalArgs) -> Result<RunParameters, CliError> {
    match &global.params {
        Some(path) => {
            debug!(path = %path.display(), "loading run parameters");
            load_run_parameters(path).map_err(|error| CliError::Stage(PrepError::from(error)))
        }
        None => Ok(RunParameters::default()),
    }
}

pub(super) fn run_stage(
    stage: PipelineStage,
    run_dir: &Path,
    params: &RunParameters,
    options: &StageOptions,
) -> Result<Vec<StageArtifact>, CliError> {
    let request = StageRequest::new(stage, run_dir);
    let artifacts = execute_stage(stage, &request, params, options)?;
    print_artifacts(stage, run_dir, &artifacts);
    Ok(artifacts)
}

pub(super) fn print_artifacts(stage: PipelineStage, run_dir: &Path, artifacts: &[StageArtifact]) {
    for artifact in artifacts {
        println!(
            "{}: wrote {}",
            stage,
            run_dir.join(&artifact.relative_path).display()
        );
    }
}

/// Writes a validation report as pretty JSON and optionally echoes it to stdout.
pub(super) fn emit_report<T: Serialize>(
    stage: PipelineStage,
    report: &T,
    report_path: Option<&PathBuf>,
    print_json: bool,
) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(report)
        .with_context(|| format!("failed to encode {} report", stage))?;
    if let Some(path) = report_path {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create report directory '{}'", parent.display())
            })?;
        }
        fs::write(path, format!("{rendered}\n"))
            .with_context(|| format!("failed to write report '{}'", path.display()))?;
        println!("JSON report: {}", path.display());
    }
    if print_json {
        println!("{rendered}");
    }
    Ok(())
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS`.
pub(super) fn utc_timestamp() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format_utc_timestamp(seconds)
}

pub(super) fn format_utc_timestamp(unix_seconds: u64) -> String {
    let days = (unix_seconds / 86_400) as i64;
    let seconds_of_day = unix_seconds % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        year,
        month,
        day,
        seconds_of_day / 3600,
        (seconds_of_day % 3600) / 60,
        seconds_of_day % 60
    )
}

// Proleptic Gregorian date from days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::{emit_report, format_utc_timestamp, load_parameters};
    use crate::cli::GlobalArgs;
    use skirt_prep_core::domain::{PipelineStage, PrepErrorCategory};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn global_with(params: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            params,
            run_dir: PathBuf::from("run"),
            verbose: false,
        }
    }

    #[test]
    fn timestamps_follow_the_civil_calendar() {
        assert_eq!(format_utc_timestamp(0), "1970-01-01T00:00:00");
        assert_eq!(format_utc_timestamp(951_782_400), "2000-02-29T00:00:00");
        assert_eq!(format_utc_timestamp(1_700_000_000), "2023-11-14T22:13:20");
    }

    #[test]
    fn parameters_come_from_defaults_or_the_params_file() {
        let defaults = load_parameters(&global_with(None)).expect("defaults should load");
        assert_eq!(defaults.views.num_views, 32);

        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("params.json");
        fs::write(&path, r#"{"views": {"num_views": 4}}"#).expect("params should be written");
        let loaded = load_parameters(&global_with(Some(path))).expect("file should load");
        assert_eq!(loaded.views.num_views, 4);
        assert_eq!(loaded.camera.distance_mpc, 10.0);

        let missing = load_parameters(&global_with(Some(temp.path().join("absent.json"))))
            .expect_err("missing file should fail");
        let crate::cli::CliError::Stage(error) = missing else {
            panic!("expected a stage error");
        };
        assert_eq!(error.category(), PrepErrorCategory::ResourceResolutionError);
    }

    #[test]
    fn reports_are_written_as_pretty_json() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("reports").join("check.json");
        emit_report(PipelineStage::CheckInputs, &vec![1, 2], Some(&path), false)
            .expect("report should be written");
        let written = fs::read_to_string(&path).expect("report should exist");
        let parsed: Vec<i32> = serde_json::from_str(&written).expect("report should parse");
        assert_eq!(parsed, vec![1, 2]);
    }
}
