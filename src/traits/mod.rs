// Traits module
//
// Capability traits the engine consumes: persisted settings and the opaque
// driver/bus access used by the concrete hardware groups.

pub mod hardware;
pub mod settings;

pub use hardware::{
    CoolerBus, DeviceDescriptor, MemoryStatus, MemoryUsage, RawReading, ScanResult, SmbusDriver, UsbDeviceInfo,
};
pub use settings::{Settings, SettingsExt};

#[cfg(test)]
pub use hardware::{MockCoolerBus, MockMemoryStatus, MockSmbusDriver};
#[cfg(test)]
pub use settings::MockSettings;
