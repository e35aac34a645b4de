//! Capabilities the engine consumes from the platform.
//!
//! The concrete register, SMBus and HID access lives behind these traits. The engine
//! only opens, scans, reads and closes; failures come back as [`Error`](crate::Error)
//! values that groups treat as failed detection attempts or unreadable channels.

use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use crate::core::types::SensorType;
use crate::error::Result;
use crate::hardware::controller::msi::MsiFanControl;

/// One module found on a memory bus scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Slot index, stable across scans
    pub index: u8,
    /// SMBus address the module answered on
    pub address: u8,
    /// Manufacturer string, when the SPD page holding it could be selected
    pub manufacturer: Option<String>,
    pub part_number: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(index: u8, address: u8) -> Self {
        Self { index, address, manufacturer: None, part_number: None }
    }

    pub fn with_part(mut self, manufacturer: impl Into<String>, part_number: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self.part_number = Some(part_number.into());
        self
    }
}

/// Result of one bus scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// Devices visible on the bus. An empty list means the bus is not ready yet.
    Devices(Vec<DeviceDescriptor>),
    /// The bus answered and definitely carries no devices
    NoDevices,
}

/// One channel value read from a device
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub sensor_type: SensorType,
    pub index: usize,
    pub name: String,
    /// `None` when the channel exists but could not be read this cycle
    pub value: Option<f32>,
}

impl RawReading {
    pub fn new(sensor_type: SensorType, index: usize, name: impl Into<String>, value: Option<f32>) -> Self {
        Self { sensor_type, index, name: name.into(), value }
    }
}

/// SMBus / SPD driver used for memory module detection
#[cfg_attr(test, automock)]
pub trait SmbusDriver: Debug + Send + Sync {
    /// Must be called once before `scan` or `read`
    fn open(&self) -> Result<()>;

    fn scan(&self) -> Result<ScanResult>;

    fn read(&self, device: &DeviceDescriptor) -> Result<Vec<RawReading>>;

    /// Releases the native handle. Called exactly once per successful `open`.
    fn close(&self) -> Result<()>;
}

/// A USB HID device visible to a [`CoolerBus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub path: String,
}

/// HID access to liquid cooler controllers
#[cfg_attr(test, automock)]
pub trait CoolerBus: Debug + Send + Sync {
    fn enumerate(&self) -> Result<Vec<UsbDeviceInfo>>;

    fn read_status(&self, device: &UsbDeviceInfo) -> Result<MsiFanControl>;
}

/// Physical or virtual memory figures in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total: u64,
    pub available: u64,
}

impl MemoryUsage {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }

    /// Used share in percent, `None` when the total is unknown
    pub fn load(&self) -> Option<f32> {
        if self.total == 0 {
            return None;
        }
        Some((self.used() as f64 / self.total as f64 * 100.0) as f32)
    }
}

/// Source of system memory statistics
#[cfg_attr(test, automock)]
pub trait MemoryStatus: Debug + Send + Sync {
    fn physical(&self) -> Result<MemoryUsage>;

    /// Physical memory plus swap / page file
    fn virtual_memory(&self) -> Result<MemoryUsage>;
}
