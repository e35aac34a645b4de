use std::fmt;
use std::sync::Arc;

use crate::core::types::HardwareType;
use crate::core::Identifier;
use crate::error::Result;
use crate::hardware::{Hardware, Probe};
use crate::traits::{DeviceDescriptor, RawReading, Settings, SmbusDriver};

/// Reads one memory module's channels through the shared SMBus driver
pub struct DimmProbe {
    driver: Arc<dyn SmbusDriver>,
    device: DeviceDescriptor,
}

impl DimmProbe {
    pub fn new(driver: Arc<dyn SmbusDriver>, device: DeviceDescriptor) -> Self {
        Self { driver, device }
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub(crate) fn sample(&mut self) -> Result<Vec<RawReading>> {
        self.driver.read(&self.device)
    }
}

impl fmt::Debug for DimmProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimmProbe").field("device", &self.device).finish()
    }
}

/// `"{manufacturer} - {part} (#{index})"`, or `"DIMM #{index}"` when the SPD
/// page with those strings was not readable.
pub fn dimm_name(device: &DeviceDescriptor) -> String {
    match (&device.manufacturer, &device.part_number) {
        (Some(manufacturer), Some(part)) => format!("{} - {} (#{})", manufacturer, part, device.index),
        _ => format!("DIMM #{}", device.index),
    }
}

pub fn dimm_identifier(index: u8) -> Result<Identifier> {
    Identifier::root(["memory".to_string(), "dimm".to_string(), index.to_string()])
}

/// Builds a DIMM hardware and populates its sensors with a first read.
pub(crate) fn build_dimm(
    driver: &Arc<dyn SmbusDriver>,
    device: DeviceDescriptor,
    settings: &Arc<dyn Settings>,
) -> Result<Arc<Hardware>> {
    let identifier = dimm_identifier(device.index)?;
    let name = dimm_name(&device);
    let properties = [
        ("manufacturer", device.manufacturer.clone()),
        ("part_number", device.part_number.clone()),
        ("smbus_address", Some(format!("0x{:02X}", device.address))),
    ];

    let hardware = Hardware::with_probe(
        name,
        identifier,
        HardwareType::Memory,
        Arc::clone(settings),
        Probe::Dimm(DimmProbe::new(Arc::clone(driver), device)),
    );
    for (key, value) in properties {
        if let Some(value) = value {
            hardware.set_property(key, value);
        }
    }
    hardware.refresh();
    Ok(hardware)
}
