use super::model::{CAMERA_TABLE_COLUMNS, CameraPosition};
use crate::domain::{PrepError, PrepResult};
use crate::modules::tables::read_table;
use std::path::Path;

/// Reads a camera table back into positions; used by the cross-artifact consistency check.
pub fn read_camera_table(path: &Path) -> PrepResult<Vec<CameraPosition>> {
    let table = read_table(path, CAMERA_TABLE_COLUMNS, "INPUT.CAMERA_TABLE")?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(line, row)| {
            let index = row[0];
            if !(index >= 0.0 && index.fract() == 0.0) {
                return Err(PrepError::schema(
                    "INPUT.CAMERA_TABLE",
                    format!(
                        "'{}' row {} has a non-integer index {}",
                        path.display(),
                        line + 1,
                        index
                    ),
                ));
            }
            Ok(CameraPosition {
                index: index as usize,
                theta_deg: row[1],
                phi_deg: row[2],
                dir: [row[3], row[4], row[5]],
                native: [row[6], row[7], row[8]],
                sub: [row[9], row[10], row[11]],
            })
        })
        .collect()
}
