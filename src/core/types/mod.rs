//! # Core Types Module
//!
//! Category enums and small value types shared by sensors and hardware.
//!
//! ## Key Types
//!
//! * `SensorType` - What a sensor measures; also its ordering key within a hardware
//! * `HardwareType` - What kind of device a hardware node represents
//! * `SensorLimits` - An optional low/high pair used for normal and critical ranges
//!
//! ## Example
//!
//! ```rust
//! use hwsense::core::types::SensorType;
//!
//! assert!(SensorType::Voltage < SensorType::Temperature);
//! assert_eq!(SensorType::Temperature.as_str(), "temperature");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of measurement a sensor reports.
///
/// Declaration order is the display order of sensor groups inside a hardware node,
/// so sensors are sorted by `(SensorType, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Voltage,
    Current,
    Power,
    Clock,
    Temperature,
    Load,
    Frequency,
    Fan,
    Flow,
    Control,
    Level,
    Factor,
    IntFactor,
    Data,
    SmallData,
    Throughput,
    TimeSpan,
    Timing,
    Energy,
    Noise,
    Conductivity,
    Humidity,
}

impl SensorType {
    /// Every variant in declaration order
    pub const ALL: [SensorType; 22] = [
        SensorType::Voltage,
        SensorType::Current,
        SensorType::Power,
        SensorType::Clock,
        SensorType::Temperature,
        SensorType::Load,
        SensorType::Frequency,
        SensorType::Fan,
        SensorType::Flow,
        SensorType::Control,
        SensorType::Level,
        SensorType::Factor,
        SensorType::IntFactor,
        SensorType::Data,
        SensorType::SmallData,
        SensorType::Throughput,
        SensorType::TimeSpan,
        SensorType::Timing,
        SensorType::Energy,
        SensorType::Noise,
        SensorType::Conductivity,
        SensorType::Humidity,
    ];

    /// Identifier segment used for sensors of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Voltage => "voltage",
            SensorType::Current => "current",
            SensorType::Power => "power",
            SensorType::Clock => "clock",
            SensorType::Temperature => "temperature",
            SensorType::Load => "load",
            SensorType::Frequency => "frequency",
            SensorType::Fan => "fan",
            SensorType::Flow => "flow",
            SensorType::Control => "control",
            SensorType::Level => "level",
            SensorType::Factor => "factor",
            SensorType::IntFactor => "intfactor",
            SensorType::Data => "data",
            SensorType::SmallData => "smalldata",
            SensorType::Throughput => "throughput",
            SensorType::TimeSpan => "timespan",
            SensorType::Timing => "timing",
            SensorType::Energy => "energy",
            SensorType::Noise => "noise",
            SensorType::Conductivity => "conductivity",
            SensorType::Humidity => "humidity",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of device a hardware node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareType {
    Motherboard,
    SuperIo,
    Cpu,
    Memory,
    GpuNvidia,
    GpuAmd,
    GpuIntel,
    Storage,
    Network,
    Cooler,
    EmbeddedController,
    Psu,
    Battery,
}

impl fmt::Display for HardwareType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HardwareType::Motherboard => "Motherboard",
            HardwareType::SuperIo => "SuperIO",
            HardwareType::Cpu => "CPU",
            HardwareType::Memory => "Memory",
            HardwareType::GpuNvidia => "GPU (NVIDIA)",
            HardwareType::GpuAmd => "GPU (AMD)",
            HardwareType::GpuIntel => "GPU (Intel)",
            HardwareType::Storage => "Storage",
            HardwareType::Network => "Network",
            HardwareType::Cooler => "Cooler",
            HardwareType::EmbeddedController => "Embedded Controller",
            HardwareType::Psu => "PSU",
            HardwareType::Battery => "Battery",
        };
        f.write_str(name)
    }
}

/// Optional lower and upper bound of a range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorLimits {
    pub low: Option<f32>,
    pub high: Option<f32>,
}

impl SensorLimits {
    pub fn new(low: Option<f32>, high: Option<f32>) -> Self {
        Self { low, high }
    }

    /// Whether `value` lies outside the configured bounds
    pub fn is_exceeded_by(&self, value: f32) -> bool {
        self.low.is_some_and(|low| value < low) || self.high.is_some_and(|high| value > high)
    }
}
