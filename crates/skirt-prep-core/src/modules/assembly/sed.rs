//! Stellar light-source strategies for the particle source.

use crate::common::AssemblyParameters;
use crate::domain::{AssemblyResult, PrepError, TableColumn};
use crate::modules::snapshot::STARS_TABLE;

pub const BRUZUAL_CHARLOT_SELECTOR: &str = "BruzualCharlotSEDFamily";
pub const BLACK_BODY_SELECTOR: &str = "BlackBodySEDFamily";
pub const BLACK_BODY_TABLE: &str = "stars_bb.txt";

pub const BLACK_BODY_TABLE_COLUMNS: [TableColumn; 6] = [
    TableColumn::new("x", "kpc"),
    TableColumn::new("y", "kpc"),
    TableColumn::new("z", "kpc"),
    TableColumn::new("hsml", "kpc"),
    TableColumn::new("R", "km"),
    TableColumn::new("T", "K"),
];

/// Resolved once per assembly; each variant knows its stellar table and XML block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SedFamily {
    /// Population-synthesis spectra, Chabrier IMF at low resolution.
    BruzualCharlot,
    /// Every star emits as a blackbody of fixed radius and temperature.
    BlackBody { radius_km: f64, temperature_k: f64 },
}

impl SedFamily {
    pub fn from_parameters(params: &AssemblyParameters) -> AssemblyResult<Self> {
        match params.sed_family.as_str() {
            BRUZUAL_CHARLOT_SELECTOR => Ok(Self::BruzualCharlot),
            BLACK_BODY_SELECTOR => {
                for (name, value) in [
                    ("bb_radius_km", params.bb_radius_km),
                    ("bb_temperature_k", params.bb_temperature_k),
                ] {
                    if !value.is_finite() || value <= 0.0 {
                        return Err(PrepError::assembly(
                            "ASSEMBLY.SED_FAMILY",
                            format!(
                                "{} must be positive for {}, got {}",
                                name, BLACK_BODY_SELECTOR, value
                            ),
                        ));
                    }
                }
                Ok(Self::BlackBody {
                    radius_km: params.bb_radius_km,
                    temperature_k: params.bb_temperature_k,
                })
            }
            other => Err(PrepError::assembly(
                "ASSEMBLY.SED_FAMILY",
                format!(
                    "unsupported SED family '{}'; expected {} or {}",
                    other, BRUZUAL_CHARLOT_SELECTOR, BLACK_BODY_SELECTOR
                ),
            )),
        }
    }

    pub const fn selector(&self) -> &'static str {
        match self {
            Self::BruzualCharlot => BRUZUAL_CHARLOT_SELECTOR,
            Self::BlackBody { .. } => BLACK_BODY_SELECTOR,
        }
    }

    /// Particle table the source reads, relative to the run directory.
    pub const fn star_table(&self) -> &'static str {
        match self {
            Self::BruzualCharlot => STARS_TABLE,
            Self::BlackBody { .. } => BLACK_BODY_TABLE,
        }
    }

    pub(crate) fn xml_element(&self) -> &'static str {
        match self {
            Self::BruzualCharlot => r#"<BruzualCharlotSEDFamily imf="Chabrier" resolution="Low"/>"#,
            Self::BlackBody { .. } => "<BlackBodySEDFamily/>",
        }
    }

    /// Rows for the substitute stellar table: position and smoothing length, then radius and temperature.
    pub fn black_body_rows(&self, star_rows: &[Vec<f64>]) -> Option<Vec<[f64; 6]>> {
        let Self::BlackBody {
            radius_km,
            temperature_k,
        } = *self
        else {
            return None;
        };
        Some(
            star_rows
                .iter()
                .filter(|row| row.len() >= 4)
                .map(|row| [row[0], row[1], row[2], row[3], radius_km, temperature_k])
                .collect(),
        )
    }
}
