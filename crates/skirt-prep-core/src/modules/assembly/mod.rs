mod model;
mod parser;
mod sed;

use super::StageExecutor;
use super::serialization::{
    ensure_output_dir, read_json_artifact, write_error, write_text_artifact,
};
use super::snapshot::{META_RECORD, STARS_TABLE};
use super::tables::{read_table, write_table};
use super::views::{VIEW_SET_DOCUMENT, read_view_set};
use crate::common::RunParameters;
use crate::domain::{
    AssemblyResult, MetaRecord, PrepError, PrepErrorCategory, PrepResult, STELLAR_TABLE_COLUMNS,
    StageArtifact, StageRequest,
};
use std::path::Path;
use tracing::{debug, info};

pub use model::{SkiSettings, render_ski};
pub use parser::{AttributeParseError, ConfigurationDocument, InstrumentSummary, parse_instruments};
pub use sed::{
    BLACK_BODY_SELECTOR, BLACK_BODY_TABLE, BLACK_BODY_TABLE_COLUMNS, BRUZUAL_CHARLOT_SELECTOR,
    SedFamily,
};

/// Loads the ingestion record; a record without the physical knobs cannot be assembled.
pub fn read_meta_record(path: &Path) -> AssemblyResult<MetaRecord> {
    read_json_artifact(path, "ASSEMBLY.META_RECORD").map_err(|error| {
        if error.category() == PrepErrorCategory::SchemaError {
            PrepError::assembly(error.placeholder(), error.message())
        } else {
            error
        }
    })
}

/// Writes the substitute stellar table used by the blackbody fallback.
pub fn write_black_body_table(
    run_dir: &Path,
    sed: &SedFamily,
) -> PrepResult<Option<StageArtifact>> {
    if matches!(sed, SedFamily::BruzualCharlot) {
        return Ok(None);
    }
    let stars = read_table(
        &run_dir.join(STARS_TABLE),
        STELLAR_TABLE_COLUMNS.len(),
        "ASSEMBLY.STELLAR_TABLE",
    )?;
    let rows = sed.black_body_rows(&stars.rows).unwrap_or_default();
    write_table(
        &run_dir.join(BLACK_BODY_TABLE),
        &BLACK_BODY_TABLE_COLUMNS,
        rows.iter().map(|row| row.as_slice()),
    )?;
    info!(rows = rows.len(), "wrote blackbody stellar table");
    Ok(Some(StageArtifact::new(BLACK_BODY_TABLE)))
}

/// Builds the simulator configuration from `meta.json`, `views.json` and the assembly knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyModule {
    timestamp: Option<String>,
}

impl AssemblyModule {
    pub fn with_timestamp(timestamp: Option<String>) -> Self {
        Self { timestamp }
    }
}

impl StageExecutor for AssemblyModule {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>> {
        let meta = read_meta_record(&request.artifact_path(META_RECORD))?;
        let views = read_view_set(&request.artifact_path(VIEW_SET_DOCUMENT))?;
        let settings = SkiSettings::resolve(
            &params.assembly,
            params.camera.distance_mpc,
            &meta,
            self.timestamp.clone(),
        )?;
        debug!(
            sed_family = settings.sed.selector(),
            field_of_view_kpc = settings.field_of_view_kpc,
            dust_to_metals = settings.dust_to_metals,
            "resolved assembly settings"
        );

        ensure_output_dir(&request.run_dir)?;
        let mut artifacts = Vec::new();
        if let Some(artifact) = write_black_body_table(&request.run_dir, &settings.sed)? {
            artifacts.push(artifact);
        }

        let ski = render_ski(&settings, &views)?;
        let ski_name = params.assembly.ski_name.as_str();
        let path = request.artifact_path(ski_name);
        write_text_artifact(&path, &ski).map_err(|source| write_error(&path, source))?;
        info!(
            instruments = views.len(),
            distance_mpc = settings.distance_mpc,
            path = %path.display(),
            "wrote configuration document"
        );
        artifacts.push(StageArtifact::new(ski_name));
        Ok(artifacts)
    }
}
