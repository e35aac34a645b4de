//! MSI all-in-one liquid cooler controllers.
//!
//! Covers the HID-attached pump/fan controllers of the MAG and MEG CoreLiquid
//! series. Each controller reports five fan headers and four temperatures in one
//! status frame ([`MsiFanControl`]).

pub mod constants;
mod cooler;
pub mod types;

pub use constants::{find_device, MsiDevice, MsiDeviceType, SUPPORTED_DEVICES};
pub(crate) use cooler::build_cooler;
pub use cooler::{readings, MsiCoolerProbe};
pub use types::{MsiFan, MsiFanConfigure, MsiFanControl, MsiFanMode};
