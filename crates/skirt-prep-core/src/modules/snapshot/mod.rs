mod model;
mod parser;

use super::StageExecutor;
use super::serialization::{ensure_output_dir, write_json_artifact};
use super::tables::write_table;
use crate::common::{IngestParameters, RunParameters};
use crate::domain::{
    GAS_TABLE_COLUMNS, GasParticle, IngestResult, MetaRecord, PrepError, PrepResult,
    STELLAR_TABLE_COLUMNS, StageArtifact, StageRequest, StellarParticle,
};
use crate::numerics::scale3;
use std::path::PathBuf;
use tracing::{debug, info};

use model::{IngestAccumulator, UnitFactors, empty_meta, resolve_mass_factor};

pub use model::{HostPosition, compute_ages_gyr, flatten_metallicity, resolve_host_position};
pub use parser::{
    Dataset, DatasetError, HostTrack, JsonSnapshotSource, ParticleGroup, SnapshotPart,
    SnapshotSource, resolve_snapshot_files,
};

pub const STARS_TABLE: &str = "stars.txt";
pub const GAS_TABLE: &str = "gas.txt";
pub const META_RECORD: &str = "meta.json";
pub(crate) const INGEST_OUTPUTS: [&str; 3] = [STARS_TABLE, GAS_TABLE, META_RECORD];

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutput {
    pub stars: Vec<StellarParticle>,
    pub gas: Vec<GasParticle>,
    pub meta: MetaRecord,
}

/// Reads every snapshot part, re-centers on the host and keeps particles inside `r_cut_kpc`.
///
/// The header of the first part supplies unit hints and the cosmology used for stellar ages.
pub fn ingest_snapshot(
    params: &IngestParameters,
    files: &[PathBuf],
    source: &dyn SnapshotSource,
) -> IngestResult<IngestOutput> {
    let Some(first_file) = files.first() else {
        return Err(PrepError::resource_resolution(
            "INPUT.SNAPSHOT_GLOB",
            format!("no snapshot files found for glob: {}", params.snapshot_glob),
        ));
    };
    let first = source.load_part(first_file)?;
    let header = first.header.clone();

    let track = source.load_host_track(&params.host_coords)?;
    let host = resolve_host_position(&track, params.snapnum)?;
    let host_pos_to_kpc = params.effective_host_pos_to_kpc();
    let host_pos_kpc = scale3(host.raw, host_pos_to_kpc);
    debug!(
        dataset = %host.position_dataset,
        x = host_pos_kpc[0],
        y = host_pos_kpc[1],
        z = host_pos_kpc[2],
        "resolved host center"
    );

    let mut meta = empty_meta(params, host_pos_to_kpc);
    meta.snapshot_files = files.iter().map(|path| path.display().to_string()).collect();
    meta.host_position_raw = host.raw;
    meta.host_position_kpc = host_pos_kpc;
    meta.host_position_dataset = host.position_dataset;
    meta.host_index_dataset = host.index_dataset;
    meta.header_attrs = header.clone();
    let mass_to_msun = resolve_mass_factor(params, &header, &mut meta);
    meta.mass_to_msun = mass_to_msun;

    let factors = UnitFactors {
        pos_to_kpc: params.pos_to_kpc,
        mass_to_msun,
        host_pos_kpc,
    };
    let mut accumulator = IngestAccumulator::new(params, factors, meta);
    accumulator.add_part(&first, &header)?;
    for path in &files[1..] {
        let part = source.load_part(path)?;
        accumulator.add_part(&part, &header)?;
    }

    let IngestAccumulator {
        meta, stars, gas, ..
    } = accumulator;
    if stars.is_empty() && gas.is_empty() {
        return Err(PrepError::empty_result(
            "RUN.EMPTY_SELECTION",
            format!(
                "no particles within r_cut_kpc={} of the host center ({} stars and {} gas particles read)",
                params.r_cut_kpc, meta.counts.stars_total, meta.counts.gas_total
            ),
        ));
    }

    Ok(IngestOutput { stars, gas, meta })
}

/// Writes the stellar table, gas table and metadata record into `run_dir`.
pub fn write_ingest_output(
    output: &IngestOutput,
    run_dir: &std::path::Path,
) -> PrepResult<Vec<StageArtifact>> {
    ensure_output_dir(run_dir)?;

    let star_rows: Vec<[f64; 7]> = output.stars.iter().map(StellarParticle::row).collect();
    write_table(
        &run_dir.join(STARS_TABLE),
        &STELLAR_TABLE_COLUMNS,
        star_rows.iter().map(|row| row.as_slice()),
    )?;
    let gas_rows: Vec<[f64; 6]> = output.gas.iter().map(GasParticle::row).collect();
    write_table(
        &run_dir.join(GAS_TABLE),
        &GAS_TABLE_COLUMNS,
        gas_rows.iter().map(|row| row.as_slice()),
    )?;
    write_json_artifact(&run_dir.join(META_RECORD), &output.meta)?;

    Ok(INGEST_OUTPUTS.iter().copied().map(StageArtifact::new).collect())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotIngestModule<S = JsonSnapshotSource> {
    source: S,
}

impl<S: SnapshotSource> SnapshotIngestModule<S> {
    pub fn with_source(source: S) -> Self {
        Self { source }
    }
}

impl<S: SnapshotSource> StageExecutor for SnapshotIngestModule<S> {
    fn execute(
        &self,
        request: &StageRequest,
        params: &RunParameters,
    ) -> PrepResult<Vec<StageArtifact>> {
        let ingest = &params.ingest;
        let files = resolve_snapshot_files(&ingest.snapshot_glob)?;
        info!(files = files.len(), glob = %ingest.snapshot_glob, "resolved snapshot parts");

        let output = ingest_snapshot(ingest, &files, &self.source)?;
        let artifacts = write_ingest_output(&output, &request.run_dir)?;
        let counts = output.meta.counts;
        info!(
            stars_kept = counts.stars_kept,
            stars_total = counts.stars_total,
            gas_kept = counts.gas_kept,
            gas_total = counts.gas_total,
            run_dir = %request.run_dir.display(),
            "wrote particle tables and meta record"
        );
        Ok(artifacts)
    }
}
