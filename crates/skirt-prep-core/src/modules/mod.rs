pub mod assembly;
pub mod camera;
pub mod serialization;
pub mod snapshot;
pub mod tables;
pub mod validation;
pub mod views;

mod dispatch;
mod traits;

pub use dispatch::{StageOptions, execute_check, execute_stage};
pub use traits::{StageExecutor, ValidationExecutor};
