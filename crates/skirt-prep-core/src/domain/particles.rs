use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableColumn {
    pub name: &'static str,
    pub unit: &'static str,
}

impl TableColumn {
    pub const fn new(name: &'static str, unit: &'static str) -> Self {
        Self { name, unit }
    }
}

pub const STELLAR_TABLE_COLUMNS: [TableColumn; 7] = [
    TableColumn::new("x", "kpc"),
    TableColumn::new("y", "kpc"),
    TableColumn::new("z", "kpc"),
    TableColumn::new("hsml", "kpc"),
    TableColumn::new("Minit", "Msun"),
    TableColumn::new("Z", "1"),
    TableColumn::new("age", "Gyr"),
];

pub const GAS_TABLE_COLUMNS: [TableColumn; 6] = [
    TableColumn::new("x", "kpc"),
    TableColumn::new("y", "kpc"),
    TableColumn::new("z", "kpc"),
    TableColumn::new("hsml", "kpc"),
    TableColumn::new("Mgas", "Msun"),
    TableColumn::new("Z", "1"),
];

/// A star particle, centered on the host and converted to kpc / Msun / Gyr.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StellarParticle {
    pub position: [f64; 3],
    pub smoothing_length: f64,
    pub initial_mass: f64,
    pub metallicity: f64,
    pub age: f64,
}

impl StellarParticle {
    pub fn row(&self) -> [f64; 7] {
        [
            self.position[0],
            self.position[1],
            self.position[2],
            self.smoothing_length,
            self.initial_mass,
            self.metallicity,
            self.age,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasParticle {
    pub position: [f64; 3],
    pub smoothing_length: f64,
    pub mass: f64,
    pub metallicity: f64,
}

impl GasParticle {
    pub fn row(&self) -> [f64; 6] {
        [
            self.position[0],
            self.position[1],
            self.position[2],
            self.smoothing_length,
            self.mass,
            self.metallicity,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleCounts {
    pub stars_total: usize,
    pub stars_kept: usize,
    pub gas_total: usize,
    pub gas_kept: usize,
}

/// Every assumption made while ingesting a snapshot.
///
/// Downstream stages read unit factors, the cut radius and the dust-to-metals
/// ratio from here instead of re-deriving them. The record carries no wall-clock
/// timestamp so that re-ingesting identical inputs yields identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    #[serde(default)]
    pub snapshot_glob: String,
    #[serde(default)]
    pub snapshot_files: Vec<String>,
    #[serde(default)]
    pub host_coords: String,
    #[serde(default)]
    pub snapnum: u64,
    pub r_cut_kpc: f64,
    pub dust_to_metals: f64,
    pub pos_to_kpc: f64,
    pub host_pos_to_kpc: f64,
    pub mass_to_msun: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_to_msun_override: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_to_kpc_from_header: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_to_msun_from_header: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_to_kpc_hint_from_hubble: Option<f64>,
    pub metallicity_scale: f64,
    pub metallicity_column: usize,
    #[serde(default)]
    pub hsml_fallback_kpc: f64,
    #[serde(default)]
    pub host_position_raw: [f64; 3],
    #[serde(default)]
    pub host_position_kpc: [f64; 3],
    #[serde(default)]
    pub host_position_dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_index_dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_now_gyr: Option<f64>,
    #[serde(default)]
    pub star_keys_used: BTreeMap<String, String>,
    #[serde(default)]
    pub gas_keys_used: BTreeMap<String, String>,
    #[serde(default)]
    pub header_attrs: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    pub counts: ParticleCounts,
}
