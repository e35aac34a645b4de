//! Diagnostics: plain-text reports and serializable tree snapshots.
//!
//! ```rust
//! use std::sync::Arc;
//! use hwsense::core::{Identifier, types::HardwareType};
//! use hwsense::hardware::Hardware;
//! use hwsense::report::HardwareSnapshot;
//! use hwsense::settings::MemorySettings;
//!
//! let hw = Hardware::new("Board", Identifier::root(["board"]).unwrap(), HardwareType::Motherboard, Arc::new(MemorySettings::new()));
//! let json = serde_json::to_string(&HardwareSnapshot::capture(&hw)).unwrap();
//! assert!(json.contains("\"identifier\":\"/board\""));
//! ```

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::core::types::{HardwareType, SensorType};
use crate::core::Identifier;
use crate::hardware::Hardware;
use crate::sensor::Sensor;

const NO_VALUE: &str = "No value";

/// Appends `"{name} ({identifier}):"`, a blank line and one `"{sensor}: {value}"`
/// line per sensor, then recurses into sub-hardware.
pub fn write_hardware(out: &mut String, hardware: &Hardware) {
    let _ = writeln!(out, "{} ({}):", hardware.name(), hardware.identifier());
    let _ = writeln!(out);
    for sensor in hardware.sensors() {
        match sensor.value() {
            Some(value) => {
                let _ = writeln!(out, "{}: {}", sensor.name(), value);
            },
            None => {
                let _ = writeln!(out, "{}: {}", sensor.name(), NO_VALUE);
            },
        }
    }
    for child in hardware.sub_hardware() {
        write_hardware(out, &child);
    }
}

/// Point-in-time copy of one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub identifier: Identifier,
    pub name: String,
    pub sensor_type: SensorType,
    pub index: usize,
    pub value: Option<f32>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub visible: bool,
}

impl SensorSnapshot {
    pub fn capture(sensor: &Sensor) -> Self {
        Self {
            identifier: sensor.identifier().clone(),
            name: sensor.name(),
            sensor_type: sensor.sensor_type(),
            index: sensor.index(),
            value: sensor.value(),
            min: sensor.min(),
            max: sensor.max(),
            visible: sensor.is_visible(),
        }
    }
}

/// Point-in-time copy of a hardware subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    pub identifier: Identifier,
    pub name: String,
    pub hardware_type: HardwareType,
    pub sensors: Vec<SensorSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_hardware: Vec<HardwareSnapshot>,
}

impl HardwareSnapshot {
    pub fn capture(hardware: &Hardware) -> Self {
        Self {
            identifier: hardware.identifier().clone(),
            name: hardware.name(),
            hardware_type: hardware.hardware_type(),
            sensors: hardware.sensors().iter().map(|s| SensorSnapshot::capture(s)).collect(),
            sub_hardware: hardware.sub_hardware().iter().map(|h| HardwareSnapshot::capture(h)).collect(),
        }
    }
}
