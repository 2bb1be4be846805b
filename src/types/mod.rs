//! Data types for panel state.
//!
//! - Validated brightness levels
//! - Calibrator, connection and cover status

pub mod brightness;
pub mod status;

pub use brightness::{Brightness, MAX_BRIGHTNESS};
pub use status::{ConnectionState, CoverStatus, DeviceStatus};
