//! D-LOGG protocol for UVR1611 / UVR61-3 solar controllers.
//!
//! The data logger answers a one byte request with one or two fixed layout
//! sub-frames (one per attached controller) followed by a single checksum
//! byte. The sub-frame type byte selects the payload length and layout.

pub mod codec;
pub mod controller;
pub mod fields;
pub mod frame;
pub mod layout;
pub mod session;

pub use fields::{HeatMeasurement, MeasurementKind, Readings, Sensor};
pub use frame::{calc_checksum, query_current_data, DeviceKind, SubFrame};
pub use session::{negotiate_mode, Mode, Session};
