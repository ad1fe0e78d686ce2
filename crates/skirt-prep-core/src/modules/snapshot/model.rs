use super::parser::{Dataset, GAS_GROUP, HostTrack, ParticleGroup, STAR_GROUP, SnapshotPart, header_f64};
use crate::common::constants::{CM_PER_KPC, G_PER_MSUN, SEC_PER_GYR};
use crate::common::{Cosmology, IngestParameters};
use crate::domain::{
    GasParticle, IngestResult, MetaRecord, ParticleCounts, PrepError, StellarParticle,
};
use crate::numerics::{norm3, scale3, sub3};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const STAR_METALLICITY_KEYS: [&str; 4] =
    ["GFM_Metallicity", "Metallicity", "StellarMetallicity", "Z"];
const STAR_FORM_TIME_KEYS: [&str; 3] = [
    "GFM_StellarFormationTime",
    "StellarFormationTime",
    "FormationTime",
];
const STAR_INIT_MASS_KEYS: [&str; 3] = ["GFM_InitialMass", "InitialMass", "BirthMass"];
const GAS_METALLICITY_KEYS: [&str; 3] = ["GFM_Metallicity", "Metallicity", "Z"];
const GAS_HSML_KEYS: [&str; 3] = ["SmoothingLength", "HSML", "Hsml"];

const HOST_INDEX_HINTS: [&str; 2] = ["snap", "index"];
/// Scale factors at or below this are treated as `a` rather than code time.
const SCALE_FACTOR_CEILING: f64 = 1.1;

#[derive(Debug, Clone, PartialEq)]
pub struct HostPosition {
    pub raw: [f64; 3],
    pub position_dataset: String,
    pub index_dataset: Option<String>,
}

/// Locates the host center at `snapnum` inside a host tracking resource.
///
/// The row comes from a 1-D snapshot-index dataset containing `snapnum`, or is
/// `snapnum` itself when no such dataset exists. The position dataset is the
/// best-scoring dataset with a length-3 axis (`host` +3, `coord`/`pos` +2).
pub fn resolve_host_position(track: &HostTrack, snapnum: u64) -> IngestResult<HostPosition> {
    let target = snapnum as f64;
    let mut row = None;
    let mut index_dataset = None;
    for (name, dataset) in &track.datasets {
        let lname = name.to_ascii_lowercase();
        if !HOST_INDEX_HINTS.iter().any(|hint| lname.contains(hint)) {
            continue;
        }
        if dataset.ndim() == 1 && !dataset.is_empty() {
            if let Some(position) = dataset.values().iter().position(|value| *value == target) {
                row = Some(position);
                index_dataset = Some(name.clone());
                break;
            }
        }
    }

    let mut candidates: Vec<(i32, &String, &Dataset)> = track
        .datasets
        .iter()
        .filter(|(_, dataset)| {
            let shape = dataset.shape();
            match dataset.ndim() {
                2 => shape[1] == 3 || shape[0] == 3,
                3 => shape.contains(&3),
                _ => false,
            }
        })
        .map(|(name, dataset)| {
            let lname = name.to_ascii_lowercase();
            let mut score = 0;
            if lname.contains("host") {
                score += 3;
            }
            if lname.contains("coord") || lname.contains("pos") {
                score += 2;
            }
            (score, name, dataset)
        })
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let Some(&(_, position_name, dataset)) = candidates.first() else {
        return Err(PrepError::schema(
            "INPUT.HOST_POSITION",
            "could not find an (N,3) or (3,N) dataset in the host coordinates resource",
        ));
    };

    let shape = dataset.shape();
    let row = match row {
        Some(row) => row,
        None => {
            let snap = snapnum as usize;
            let fits_rows = shape[0] > snap;
            let fits_columns = shape[0] == 3 && shape[shape.len() - 1] > snap;
            if fits_rows || fits_columns {
                snap
            } else {
                return Err(PrepError::schema(
                    "INPUT.HOST_INDEX",
                    format!(
                        "could not locate snapshot {} in the host coordinates resource; add a snapshot index dataset or adjust snapnum",
                        snapnum
                    ),
                ));
            }
        }
    };

    let component = |axis: usize| -> Option<f64> {
        match shape {
            [_, 3] => dataset.get(&[row, axis]),
            [3, _] => dataset.get(&[axis, row]),
            [_, 1, 3] => dataset.get(&[row, 0, axis]),
            [1, _, 3] => dataset.get(&[0, row, axis]),
            [_, _, 3] => dataset.get(&[row, 0, axis]),
            [3, _, _] => dataset.get(&[axis, row, 0]),
            _ => None,
        }
    };

    match (component(0), component(1), component(2)) {
        (Some(x), Some(y), Some(z)) => Ok(HostPosition {
            raw: [x, y, z],
            position_dataset: position_name.clone(),
            index_dataset,
        }),
        _ => Err(PrepError::schema(
            "INPUT.HOST_POSITION",
            format!(
                "host position dataset '{}' with shape {:?} has no entry for row {}",
                position_name, shape, row
            ),
        )),
    }
}

/// Reduces a metallicity dataset to one scalar per particle.
///
/// Multi-column fields keep exactly one column; columns are never summed.
/// Returns the values and the column actually used.
pub fn flatten_metallicity(
    dataset: &Dataset,
    column: usize,
    notes: &mut BTreeMap<String, String>,
) -> IngestResult<(Vec<f64>, usize)> {
    match dataset.shape() {
        [_] => Ok((dataset.values().to_vec(), 0)),
        [_, 1] => Ok((dataset.values().to_vec(), 0)),
        [_, width] => {
            let used = if column < *width { column } else { 0 };
            notes.insert(
                "metallicity_note".to_string(),
                format!(
                    "Metallicity array has {} columns; using column {}.",
                    width, used
                ),
            );
            let values = dataset.column(used).unwrap_or_default();
            Ok((values, used))
        }
        shape => Err(PrepError::schema(
            "INPUT.SNAPSHOT_METALLICITY",
            format!("unsupported metallicity array shape {:?}", shape),
        )),
    }
}

/// Stellar ages in Gyr from formation times, using whichever time model the header supports.
pub fn compute_ages_gyr(
    formation_times: &[f64],
    header: &BTreeMap<String, Value>,
    notes: &mut BTreeMap<String, String>,
    age_now_gyr: &mut Option<f64>,
) -> Vec<f64> {
    if formation_times.is_empty() {
        return Vec::new();
    }

    let a_now = header_f64(header, "Time");
    let ft_max = formation_times
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let clip = |values: Vec<f64>| -> Vec<f64> { values.into_iter().map(|v| v.max(0.0)).collect() };

    if let Some(a_now) = a_now {
        if a_now <= SCALE_FACTOR_CEILING && ft_max <= SCALE_FACTOR_CEILING {
            let cosmology = match (
                header_f64(header, "Omega0"),
                header_f64(header, "OmegaLambda"),
                header_f64(header, "HubbleParam"),
            ) {
                (Some(omega_matter), Some(omega_lambda), Some(hubble_param)) => Some(Cosmology {
                    omega_matter,
                    omega_lambda,
                    hubble_param,
                }),
                _ => None,
            };

            if let Some(cosmology) = cosmology {
                let t_now = cosmology.cosmic_time_gyr(&[a_now])[0];
                let t_form = cosmology.cosmic_time_gyr(formation_times);
                notes.insert(
                    "age_note".to_string(),
                    "Ages computed from scale factor using LCDM with Omega0, OmegaLambda, HubbleParam."
                        .to_string(),
                );
                *age_now_gyr = Some(t_now);
                return clip(t_form.into_iter().map(|t| t_now - t).collect());
            }

            notes.insert(
                "age_note".to_string(),
                "Formation time looks like scale factor but cosmology missing; using delta(a) as age proxy."
                    .to_string(),
            );
            return clip(formation_times.iter().map(|ft| a_now - ft).collect());
        }

        if let Some(unit_time_s) = header_f64(header, "UnitTimeInS") {
            let unit_time_gyr = unit_time_s / SEC_PER_GYR;
            notes.insert(
                "age_note".to_string(),
                "Ages computed from code time units using UnitTimeInS.".to_string(),
            );
            return clip(
                formation_times
                    .iter()
                    .map(|ft| (a_now - ft) * unit_time_gyr)
                    .collect(),
            );
        }

        notes.insert(
            "age_note".to_string(),
            "Ages computed as Time - formation time; assuming both are in Gyr.".to_string(),
        );
        return clip(formation_times.iter().map(|ft| a_now - ft).collect());
    }

    notes.insert(
        "age_note".to_string(),
        "Could not interpret formation times; setting ages to 0 Gyr.".to_string(),
    );
    vec![0.0; formation_times.len()]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct UnitFactors {
    pub(crate) pos_to_kpc: f64,
    pub(crate) mass_to_msun: f64,
    pub(crate) host_pos_kpc: [f64; 3],
}

/// Accumulates particles across snapshot parts and records every choice in the meta record.
pub(crate) struct IngestAccumulator<'a> {
    params: &'a IngestParameters,
    factors: UnitFactors,
    pub(crate) meta: MetaRecord,
    pub(crate) stars: Vec<StellarParticle>,
    pub(crate) gas: Vec<GasParticle>,
}

impl<'a> IngestAccumulator<'a> {
    pub(crate) fn new(params: &'a IngestParameters, factors: UnitFactors, meta: MetaRecord) -> Self {
        Self {
            params,
            factors,
            meta,
            stars: Vec::new(),
            gas: Vec::new(),
        }
    }

    pub(crate) fn add_part(&mut self, part: &SnapshotPart, header: &BTreeMap<String, Value>) -> IngestResult<()> {
        if let Some(group) = part.group(STAR_GROUP) {
            self.add_stars(group, header)?;
        }
        if let Some(group) = part.group(GAS_GROUP) {
            self.add_gas(group)?;
        }
        Ok(())
    }

    fn add_stars(&mut self, group: &ParticleGroup, header: &BTreeMap<String, Value>) -> IngestResult<()> {
        let (coords, masses) = required_coordinates_and_masses(group, STAR_GROUP)?;
        let count = coords.len();
        let keys = &mut self.meta.star_keys_used;
        keys.entry("Coordinates".to_string())
            .or_insert_with(|| "Coordinates".to_string());
        keys.entry("Masses".to_string())
            .or_insert_with(|| "Masses".to_string());

        let metallicity_key = group.find_first_key(&STAR_METALLICITY_KEYS);
        let formation_key = group.find_first_key(&STAR_FORM_TIME_KEYS);
        let initial_mass_key = group.find_first_key(&STAR_INIT_MASS_KEYS);
        for (label, key) in [
            ("Metallicity", metallicity_key),
            ("FormationTime", formation_key),
            ("InitialMass", initial_mass_key),
        ] {
            if let Some(key) = key {
                keys.entry(label.to_string())
                    .or_insert_with(|| key.to_string());
            }
        }

        let metallicity = match metallicity_key {
            Some(key) => Some(self.metallicity_for(group, key, STAR_GROUP, count)?),
            None => None,
        };
        let formation_times = match formation_key {
            Some(key) => Some(per_particle(group, key, STAR_GROUP, count)?),
            None => None,
        };
        let initial_masses = match initial_mass_key {
            Some(key) => Some(per_particle(group, key, STAR_GROUP, count)?),
            None => None,
        };

        let (centered, keep) = self.center_and_cut(&coords);
        self.meta.counts.stars_total += count;

        let kept_formation: Option<Vec<f64>> = formation_times
            .as_ref()
            .map(|values| select(values, &keep));
        let ages = match &kept_formation {
            Some(values) => compute_ages_gyr(
                values,
                header,
                &mut self.meta.notes,
                &mut self.meta.age_now_gyr,
            ),
            None => {
                self.meta.notes.insert(
                    "age_note".to_string(),
                    "No formation time dataset found; setting ages to 0 Gyr.".to_string(),
                );
                vec![0.0; keep.len()]
            }
        };

        let minit_source = match &initial_masses {
            Some(values) => values,
            None => {
                self.meta.notes.insert(
                    "initial_mass_note".to_string(),
                    "Initial mass not found; using Masses as Minit.".to_string(),
                );
                &masses
            }
        };

        for (slot, &i) in keep.iter().enumerate() {
            let metallicity = metallicity
                .as_ref()
                .map_or(0.0, |values| values[i])
                * self.params.metallicity_scale;
            self.stars.push(StellarParticle {
                position: centered[i],
                smoothing_length: self.params.hsml_fallback_kpc,
                initial_mass: minit_source[i] * self.factors.mass_to_msun,
                metallicity,
                age: ages.get(slot).copied().unwrap_or(0.0),
            });
        }
        self.meta.counts.stars_kept += keep.len();
        debug!(
            total = count,
            kept = keep.len(),
            "processed stellar particles in snapshot part"
        );
        Ok(())
    }

    fn add_gas(&mut self, group: &ParticleGroup) -> IngestResult<()> {
        let (coords, masses) = required_coordinates_and_masses(group, GAS_GROUP)?;
        let count = coords.len();
        let keys = &mut self.meta.gas_keys_used;
        keys.entry("Coordinates".to_string())
            .or_insert_with(|| "Coordinates".to_string());
        keys.entry("Masses".to_string())
            .or_insert_with(|| "Masses".to_string());

        let metallicity_key = group.find_first_key(&GAS_METALLICITY_KEYS);
        let hsml_key = group.find_first_key(&GAS_HSML_KEYS);
        for (label, key) in [("Metallicity", metallicity_key), ("SmoothingLength", hsml_key)] {
            if let Some(key) = key {
                keys.entry(label.to_string())
                    .or_insert_with(|| key.to_string());
            }
        }

        let metallicity = match metallicity_key {
            Some(key) => Some(self.metallicity_for(group, key, GAS_GROUP, count)?),
            None => None,
        };
        let hsml = match hsml_key {
            Some(key) => Some(per_particle(group, key, GAS_GROUP, count)?),
            None => {
                self.meta.notes.insert(
                    "hsml_note".to_string(),
                    "SmoothingLength missing; using constant fallback.".to_string(),
                );
                None
            }
        };

        let (centered, keep) = self.center_and_cut(&coords);
        self.meta.counts.gas_total += count;

        for &i in &keep {
            let smoothing_length = hsml
                .as_ref()
                .map_or(self.params.hsml_fallback_kpc, |values| {
                    values[i] * self.factors.pos_to_kpc
                });
            let metallicity = metallicity
                .as_ref()
                .map_or(0.0, |values| values[i])
                * self.params.metallicity_scale;
            self.gas.push(GasParticle {
                position: centered[i],
                smoothing_length,
                mass: masses[i] * self.factors.mass_to_msun,
                metallicity,
            });
        }
        self.meta.counts.gas_kept += keep.len();
        debug!(
            total = count,
            kept = keep.len(),
            "processed gas particles in snapshot part"
        );
        Ok(())
    }

    fn metallicity_for(
        &mut self,
        group: &ParticleGroup,
        key: &str,
        group_name: &str,
        count: usize,
    ) -> IngestResult<Vec<f64>> {
        let dataset = group.get(key).ok_or_else(|| missing_field(group_name, key))?;
        let (values, used) =
            flatten_metallicity(dataset, self.params.metallicity_column, &mut self.meta.notes)?;
        if used != self.params.metallicity_column {
            self.meta.metallicity_column = used;
        }
        check_length(&values, count, group_name, key)?;
        Ok(values)
    }

    /// Converts to kpc, subtracts the host center, and returns the indices inside the cut radius.
    fn center_and_cut(&self, coords: &[[f64; 3]]) -> (Vec<[f64; 3]>, Vec<usize>) {
        let centered: Vec<[f64; 3]> = coords
            .iter()
            .map(|position| {
                sub3(
                    scale3(*position, self.factors.pos_to_kpc),
                    self.factors.host_pos_kpc,
                )
            })
            .collect();
        let keep = centered
            .iter()
            .enumerate()
            .filter(|(_, position)| norm3(**position) <= self.params.r_cut_kpc)
            .map(|(index, _)| index)
            .collect();
        (centered, keep)
    }
}

/// Records header-derived unit hints and picks the mass factor actually applied.
pub(crate) fn resolve_mass_factor(
    params: &IngestParameters,
    header: &BTreeMap<String, Value>,
    meta: &mut MetaRecord,
) -> f64 {
    if let Some(unit_length_cm) = header_f64(header, "UnitLengthInCm") {
        meta.pos_to_kpc_from_header = Some(unit_length_cm / CM_PER_KPC);
    } else {
        meta.notes.insert(
            "pos_to_kpc_note".to_string(),
            "UnitLengthInCm missing; using pos_to_kpc parameter (default 1.0 unless overridden)."
                .to_string(),
        );
        if let Some(hubble) = header_f64(header, "HubbleParam") {
            meta.pos_to_kpc_hint_from_hubble = Some(1.0 / hubble);
        }
    }

    if let Some(unit_mass_g) = header_f64(header, "UnitMassInG") {
        meta.mass_to_msun_from_header = Some(unit_mass_g / G_PER_MSUN);
    } else {
        meta.notes.insert(
            "mass_to_msun_note".to_string(),
            "UnitMassInG missing; using mass_to_msun parameter if provided, else 1.0.".to_string(),
        );
    }

    params
        .mass_to_msun
        .or(meta.mass_to_msun_from_header)
        .unwrap_or(1.0)
}

pub(crate) fn empty_meta(params: &IngestParameters, host_pos_to_kpc: f64) -> MetaRecord {
    MetaRecord {
        snapshot_glob: params.snapshot_glob.clone(),
        snapshot_files: Vec::new(),
        host_coords: params.host_coords.display().to_string(),
        snapnum: params.snapnum,
        r_cut_kpc: params.r_cut_kpc,
        dust_to_metals: params.dust_to_metals,
        pos_to_kpc: params.pos_to_kpc,
        host_pos_to_kpc,
        mass_to_msun: 1.0,
        mass_to_msun_override: params.mass_to_msun,
        pos_to_kpc_from_header: None,
        mass_to_msun_from_header: None,
        pos_to_kpc_hint_from_hubble: None,
        metallicity_scale: params.metallicity_scale,
        metallicity_column: params.metallicity_column,
        hsml_fallback_kpc: params.hsml_fallback_kpc,
        host_position_raw: [0.0; 3],
        host_position_kpc: [0.0; 3],
        host_position_dataset: String::new(),
        host_index_dataset: None,
        age_now_gyr: None,
        star_keys_used: BTreeMap::new(),
        gas_keys_used: BTreeMap::new(),
        header_attrs: BTreeMap::new(),
        notes: BTreeMap::new(),
        counts: ParticleCounts::default(),
    }
}

fn required_coordinates_and_masses(
    group: &ParticleGroup,
    group_name: &str,
) -> IngestResult<(Vec<[f64; 3]>, Vec<f64>)> {
    let coords = group
        .get("Coordinates")
        .ok_or_else(|| missing_field(group_name, "Coordinates"))?
        .rows3()
        .ok_or_else(|| {
            PrepError::schema(
                "INPUT.SNAPSHOT_DATASET",
                format!("{}/Coordinates must have shape (N, 3)", group_name),
            )
        })?;
    let masses = per_particle(group, "Masses", group_name, coords.len())?;
    Ok((coords, masses))
}

fn per_particle(
    group: &ParticleGroup,
    key: &str,
    group_name: &str,
    count: usize,
) -> IngestResult<Vec<f64>> {
    let dataset = group.get(key).ok_or_else(|| missing_field(group_name, key))?;
    let values = match dataset.shape() {
        [_] | [_, 1] => dataset.values().to_vec(),
        shape => {
            return Err(PrepError::schema(
                "INPUT.SNAPSHOT_DATASET",
                format!(
                    "{}/{} must be one value per particle, got shape {:?}",
                    group_name, key, shape
                ),
            ));
        }
    };
    check_length(&values, count, group_name, key)?;
    Ok(values)
}

fn check_length(values: &[f64], count: usize, group_name: &str, key: &str) -> IngestResult<()> {
    if values.len() == count {
        Ok(())
    } else {
        Err(PrepError::schema(
            "INPUT.SNAPSHOT_DATASET",
            format!(
                "{}/{} has {} entries but Coordinates has {}",
                group_name,
                key,
                values.len(),
                count
            ),
        ))
    }
}

fn missing_field(group_name: &str, key: &str) -> PrepError {
    PrepError::schema(
        "INPUT.SNAPSHOT_FIELD",
        format!("required dataset {}/{} is absent", group_name, key),
    )
}

fn select(values: &[f64], keep: &[usize]) -> Vec<f64> {
    keep.iter().map(|&i| values[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::{compute_ages_gyr, flatten_metallicity, resolve_host_position};
    use crate::domain::PrepErrorCategory;
    use crate::modules::snapshot::parser::{Dataset, HostTrack};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    fn header(pairs: &[(&str, f64)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), json!(value)))
            .collect()
    }

    #[test]
    fn host_position_prefers_index_dataset_and_host_named_positions() {
        let track = HostTrack::default()
            .with_dataset("snapshot/index", Dataset::from_vector(vec![598.0, 599.0, 600.0]))
            .with_dataset(
                "host/position",
                Dataset::from_rows(&[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 4.0, 5.0]]),
            )
            .with_dataset(
                "satellite/velocity",
                Dataset::from_rows(&[[9.0, 9.0, 9.0], [9.0, 9.0, 9.0], [9.0, 9.0, 9.0]]),
            );

        let host = resolve_host_position(&track, 600).expect("host should resolve");
        assert_eq!(host.raw, [3.0, 4.0, 5.0]);
        assert_eq!(host.position_dataset, "host/position");
        assert_eq!(host.index_dataset.as_deref(), Some("snapshot/index"));
    }

    #[test]
    fn host_position_falls_back_to_row_equal_to_snapnum_and_transposed_layout() {
        let transposed = Dataset::new(
            vec![3, 3],
            vec![10.0, 11.0, 12.0, 20.0, 21.0, 22.0, 30.0, 31.0, 32.0],
        );
        // (3, 3) is read row-wise because the trailing axis has length 3.
        let track = HostTrack::default().with_dataset("host_coordinates", transposed);
        let host = resolve_host_position(&track, 1).expect("host should resolve");
        assert_eq!(host.raw, [20.0, 21.0, 22.0]);
        assert!(host.index_dataset.is_none());

        let column_major = Dataset::new(
            vec![3, 4],
            vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0, 20.0, 21.0, 22.0, 23.0],
        );
        let track = HostTrack::default().with_dataset("pos", column_major);
        let host = resolve_host_position(&track, 3).expect("host should resolve");
        assert_eq!(host.raw, [3.0, 13.0, 23.0]);

        let nested = Dataset::new(vec![2, 1, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let track = HostTrack::default().with_dataset("host.coords", nested);
        let host = resolve_host_position(&track, 1).expect("host should resolve");
        assert_eq!(host.raw, [4.0, 5.0, 6.0]);
    }

    #[test]
    fn host_position_errors_are_schema_errors() {
        let empty = HostTrack::default().with_dataset("snapnum", Dataset::from_vector(vec![1.0]));
        let error = resolve_host_position(&empty, 600).expect_err("no position dataset");
        assert_eq!(error.category(), PrepErrorCategory::SchemaError);

        let short = HostTrack::default()
            .with_dataset("host/position", Dataset::from_rows(&[[0.0, 0.0, 0.0]]));
        let error = resolve_host_position(&short, 600).expect_err("row out of range");
        assert_eq!(error.placeholder(), "INPUT.HOST_INDEX");
    }

    #[test]
    fn multi_column_metallicity_selects_one_column_and_never_sums() {
        let mut notes = BTreeMap::new();
        let dataset = Dataset::from_rows(&[[0.02, 0.01, 0.005], [0.04, 0.02, 0.01]]);

        let (values, used) = flatten_metallicity(&dataset, 0, &mut notes).expect("flatten");
        assert_eq!(used, 0);
        assert_eq!(values, vec![0.02, 0.04]);
        assert!(notes["metallicity_note"].contains("3 columns"));

        let (values, used) = flatten_metallicity(&dataset, 2, &mut notes).expect("flatten");
        assert_eq!(used, 2);
        assert_eq!(values, vec![0.005, 0.01]);

        let (_, used) = flatten_metallicity(&dataset, 9, &mut notes).expect("flatten");
        assert_eq!(used, 0);

        let squeezed = Dataset::new(vec![2, 1], vec![0.1, 0.2]);
        let (values, _) = flatten_metallicity(&squeezed, 0, &mut notes).expect("flatten");
        assert_eq!(values, vec![0.1, 0.2]);

        let cube = Dataset::new(vec![1, 1, 1], vec![0.1]);
        assert!(flatten_metallicity(&cube, 0, &mut notes).is_err());
    }

    #[test]
    fn ages_use_cosmology_when_formation_times_are_scale_factors() {
        let mut notes = BTreeMap::new();
        let mut age_now = None;
        let header = header(&[
            ("Time", 1.0),
            ("Omega0", 0.272),
            ("OmegaLambda", 0.728),
            ("HubbleParam", 0.702),
        ]);
        let ages = compute_ages_gyr(&[1.0, 0.5, 0.1], &header, &mut notes, &mut age_now);
        assert!(ages[0].abs() < 1.0e-9);
        assert!(ages[1] > 5.0 && ages[1] < ages[2]);
        assert!(age_now.expect("age of universe recorded") > 13.0);
        assert!(notes["age_note"].contains("LCDM"));
    }

    #[test]
    fn ages_fall_back_through_simpler_time_models() {
        let mut notes = BTreeMap::new();
        let mut age_now = None;

        let ages = compute_ages_gyr(&[0.5, 1.2], &header(&[("Time", 1.0)]), &mut notes, &mut age_now);
        assert_eq!(ages, vec![0.5, 0.0]);
        assert!(notes["age_note"].contains("Time - formation time"));

        let ages = compute_ages_gyr(&[0.5], &header(&[("Time", 0.9)]), &mut notes, &mut age_now);
        assert!((ages[0] - 0.4).abs() < 1.0e-12);
        assert!(notes["age_note"].contains("delta(a)"));

        let ages = compute_ages_gyr(
            &[2.0],
            &header(&[("Time", 3.0), ("UnitTimeInS", 3.15576e16)]),
            &mut notes,
            &mut age_now,
        );
        assert!((ages[0] - 1.0).abs() < 1.0e-12);

        let ages = compute_ages_gyr(&[2.0, 3.0], &BTreeMap::new(), &mut notes, &mut age_now);
        assert_eq!(ages, vec![0.0, 0.0]);
        assert!(age_now.is_none());
    }
}
