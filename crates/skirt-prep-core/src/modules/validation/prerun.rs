use crate::common::constants::{CENTERING_WARNING_KPC, METALLICITY_WARNING_MAX};
use crate::domain::{
    GAS_TABLE_COLUMNS, MetaRecord, PrepError, STELLAR_TABLE_COLUMNS, ValidationResult,
};
use crate::modules::snapshot::{GAS_TABLE, META_RECORD, STARS_TABLE};
use crate::modules::serialization::read_json_artifact;
use crate::modules::tables::{ParsedTable, read_table};
use crate::numerics::median;
use serde::Serialize;
use std::path::Path;

/// Both particle tables keep metallicity in column 6.
const METALLICITY_COLUMN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub coordinate_medians: [f64; 3],
    pub metallicity_range: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreRunReport {
    pub stars: TableSummary,
    pub gas: TableSummary,
    pub warnings: Vec<String>,
}

/// Structural and physical checks on the particle tables before the simulator is started.
///
/// Malformed rows, non-finite values and metallicity outside `[0, 1)` are
/// schema errors. Row counts that disagree with `meta.json` are consistency
/// errors and an empty table is an empty-result error. Metal-rich tables and
/// off-center medians only produce warnings.
pub fn check_inputs(run_dir: &Path) -> ValidationResult<PreRunReport> {
    let meta: MetaRecord = read_json_artifact(&run_dir.join(META_RECORD), "CHECK.META_RECORD")?;
    let stars = read_table(
        &run_dir.join(STARS_TABLE),
        STELLAR_TABLE_COLUMNS.len(),
        "CHECK.STELLAR_TABLE",
    )?;
    let gas = read_table(
        &run_dir.join(GAS_TABLE),
        GAS_TABLE_COLUMNS.len(),
        "CHECK.GAS_TABLE",
    )?;

    let mut warnings = Vec::new();
    let stars = check_table("Star", STARS_TABLE, &stars, meta.counts.stars_kept, &mut warnings)?;
    let gas = check_table("Gas", GAS_TABLE, &gas, meta.counts.gas_kept, &mut warnings)?;

    Ok(PreRunReport {
        stars,
        gas,
        warnings,
    })
}

pub fn check_table(
    label: &str,
    file_name: &str,
    table: &ParsedTable,
    expected_rows: usize,
    warnings: &mut Vec<String>,
) -> ValidationResult<TableSummary> {
    for (row_index, row) in table.rows.iter().enumerate() {
        if let Some(column) = row.iter().position(|value| !value.is_finite()) {
            return Err(PrepError::schema(
                "CHECK.NON_FINITE",
                format!(
                    "{} row {} column {} is not finite ({})",
                    file_name,
                    row_index + 1,
                    column + 1,
                    row[column]
                ),
            ));
        }
    }
    if table.len() != expected_rows {
        return Err(PrepError::consistency(
            "CHECK.ROW_COUNT",
            format!(
                "{} has {} rows but meta.json records {}",
                file_name,
                table.len(),
                expected_rows
            ),
        ));
    }

    if table.is_empty() {
        return Err(PrepError::empty_result(
            "CHECK.EMPTY_TABLES",
            format!("{} has no rows", file_name),
        ));
    }

    let mut medians = [0.0; 3];
    for (axis, slot) in medians.iter_mut().enumerate() {
        *slot = median(&table.column(axis)).unwrap_or(0.0);
    }
    let metallicity = table.column(METALLICITY_COLUMN);
    let z_min = metallicity.iter().copied().fold(f64::INFINITY, f64::min);
    let z_max = metallicity.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if z_min < 0.0 || z_max >= 1.0 {
        return Err(PrepError::schema(
            "CHECK.METALLICITY_RANGE",
            format!(
                "{} metallicity must be a mass fraction in [0, 1), found min {} max {}",
                file_name, z_min, z_max
            ),
        ));
    }
    if z_max > METALLICITY_WARNING_MAX {
        warnings.push(format!(
            "{} metallicity above {}: max {}",
            label, METALLICITY_WARNING_MAX, z_max
        ));
    }
    for (axis, value) in ["x", "y", "z"].iter().zip(medians) {
        if value.abs() > CENTERING_WARNING_KPC {
            warnings.push(format!(
                "{} {}-median {:.3} kpc not centered",
                label, axis, value
            ));
        }
    }

    Ok(TableSummary {
        rows: table.len(),
        coordinate_medians: medians,
        metallicity_range: [z_min, z_max],
    })
}
