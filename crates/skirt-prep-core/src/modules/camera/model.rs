use crate::modules::serialization::{format_fixed_f64, format_space_signed};
use crate::common::constants::KPC_PER_MPC;
use crate::domain::{PrepError, PrepResult, ViewSet};
use crate::numerics::scale3;

pub const CAMERA_TABLE_HEADER: &str = "# index theta_deg phi_deg  dx dy dz  cam_x_Mpc cam_y_Mpc cam_z_Mpc  cam_x_kpc cam_y_kpc cam_z_kpc";
pub(crate) const CAMERA_TABLE_COLUMNS: usize = 12;
const VECTOR_PRECISION: usize = 8;

/// Observer position for one view: `native` in Mpc, `sub` in kpc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    pub index: usize,
    pub theta_deg: f64,
    pub phi_deg: f64,
    pub dir: [f64; 3],
    pub native: [f64; 3],
    pub sub: [f64; 3],
}

impl CameraPosition {
    pub fn render_row(&self) -> String {
        let mut fields = vec![
            format!("{:2}", self.index),
            format_fixed_f64(self.theta_deg, 12, 6),
            format_fixed_f64(self.phi_deg, 12, 6),
        ];
        for vector in [self.dir, self.native, self.sub] {
            fields.extend(
                vector
                    .iter()
                    .map(|component| format_space_signed(*component, VECTOR_PRECISION)),
            );
        }
        fields.join(" ")
    }
}

pub fn derive_camera_positions(
    views: &ViewSet,
    distance_mpc: f64,
) -> PrepResult<Vec<CameraPosition>> {
    if !distance_mpc.is_finite() || distance_mpc <= 0.0 {
        return Err(PrepError::schema(
            "INPUT.CAMERA_DISTANCE",
            format!("camera distance must be positive, got {} Mpc", distance_mpc),
        ));
    }
    if views.is_empty() {
        return Err(PrepError::empty_result(
            "RUN.ZERO_VIEWS",
            "cannot derive camera positions from an empty view set",
        ));
    }

    Ok(views
        .iter()
        .map(|view| {
            let native = scale3(view.dir, distance_mpc);
            CameraPosition {
                index: view.index,
                theta_deg: view.theta_deg,
                phi_deg: view.phi_deg,
                dir: view.dir,
                native,
                sub: scale3(native, KPC_PER_MPC),
            }
        })
        .collect())
}

pub fn render_camera_table(positions: &[CameraPosition]) -> String {
    let mut content = String::from(CAMERA_TABLE_HEADER);
    content.push('\n');
    for position in positions {
        content.push_str(&position.render_row());
        content.push('\n');
    }
    content
}
