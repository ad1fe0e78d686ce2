//! Cosmic time from scale factor for a Friedmann model without radiation.

use super::constants::{KM_PER_MPC, SEC_PER_GYR};
use crate::numerics::{cumulative_trapezoid, interp, linspace};

const MIN_SCALE_FACTOR: f64 = 1.0e-4;
const INTEGRATION_POINTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cosmology {
    pub omega_matter: f64,
    pub omega_lambda: f64,
    /// Dimensionless Hubble parameter h, with H0 = 100 h km/s/Mpc.
    pub hubble_param: f64,
}

impl Cosmology {
    pub fn hubble_time_gyr(&self) -> f64 {
        let h0_per_second = 100.0 * self.hubble_param / KM_PER_MPC;
        (1.0 / h0_per_second) / SEC_PER_GYR
    }

    /// Age of the universe in Gyr at each scale factor.
    ///
    /// The integral runs from `a = 1e-4` up to the largest requested scale factor.
    pub fn cosmic_time_gyr(&self, scale_factors: &[f64]) -> Vec<f64> {
        if scale_factors.is_empty() {
            return Vec::new();
        }

        let a_max = scale_factors
            .iter()
            .copied()
            .filter(|a| a.is_finite())
            .fold(MIN_SCALE_FACTOR, f64::max);
        let grid = linspace(MIN_SCALE_FACTOR, a_max, INTEGRATION_POINTS);
        let omega_curvature = 1.0 - self.omega_matter - self.omega_lambda;
        let integrand: Vec<f64> = grid
            .iter()
            .map(|a| {
                let e = (self.omega_matter / a.powi(3)
                    + omega_curvature / a.powi(2)
                    + self.omega_lambda)
                    .sqrt();
                1.0 / (a * e)
            })
            .collect();

        let hubble_time = self.hubble_time_gyr();
        let times: Vec<f64> = cumulative_trapezoid(&grid, &integrand)
            .into_iter()
            .map(|value| value * hubble_time)
            .collect();

        scale_factors
            .iter()
            .map(|a| interp(*a, &grid, &times))
            .collect()
    }
}
