use crate::domain::{PrepError, ValidationResult};
use crate::modules::assembly::ConfigurationDocument;
use globset::Glob;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentOutput {
    pub instrument: String,
    /// Matching image files, sorted by name.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRunReport {
    pub output_dir: String,
    pub instruments: Vec<InstrumentOutput>,
    pub missing: Vec<String>,
}

impl PostRunReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// The report as a failure, for callers that treat any missing image as fatal.
    pub fn missing_error(&self) -> Option<PrepError> {
        if self.is_complete() {
            return None;
        }
        Some(PrepError::artifact_missing(
            "CHECK.MISSING_IMAGES",
            format!(
                "missing images for {} of {} instruments in '{}': {}",
                self.missing.len(),
                self.instruments.len(),
                self.output_dir,
                self.missing.join(", ")
            ),
        ))
    }
}

pub fn image_pattern(instrument: &str) -> String {
    format!("*{instrument}_*.fits")
}

/// Looks for at least one `*<instrument>_*.fits` file per declared instrument.
///
/// Missing images are listed in the report rather than returned as an error.
/// A nonexistent output directory counts every instrument as missing.
pub fn check_outputs(
    document: &ConfigurationDocument,
    output_dir: &Path,
) -> ValidationResult<PostRunReport> {
    let mut file_names: Vec<String> = match fs::read_dir(output_dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!(output_dir = %output_dir.display(), "output directory does not exist");
            Vec::new()
        }
        Err(source) => {
            return Err(PrepError::io_system(
                "CHECK.OUTPUT_DIRECTORY",
                format!("failed to list '{}': {}", output_dir.display(), source),
            ));
        }
    };
    file_names.sort();

    let mut instruments = Vec::with_capacity(document.instruments.len());
    let mut missing = Vec::new();
    for instrument in &document.instruments {
        let pattern = image_pattern(&instrument.name);
        let matcher = Glob::new(&pattern)
            .map_err(|source| {
                PrepError::schema(
                    "CHECK.IMAGE_PATTERN",
                    format!("invalid image pattern '{}': {}", pattern, source),
                )
            })?
            .compile_matcher();
        let files: Vec<String> = file_names
            .iter()
            .filter(|name| matcher.is_match(name.as_str()))
            .cloned()
            .collect();
        if files.is_empty() {
            warn!(instrument = %instrument.name, pattern = %pattern, "no output image found");
            missing.push(instrument.name.clone());
        }
        instruments.push(InstrumentOutput {
            instrument: instrument.name.clone(),
            files,
        });
    }

    Ok(PostRunReport {
        output_dir: output_dir.display().to_string(),
        instruments,
        missing,
    })
}
