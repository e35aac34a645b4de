use std::fmt;
use std::sync::Arc;

use super::constants::{MsiDevice, FAN_COUNT};
use super::types::MsiFanControl;
use crate::core::types::{HardwareType, SensorType};
use crate::core::Identifier;
use crate::error::Result;
use crate::hardware::{Hardware, Probe};
use crate::sensor::Sensor;
use crate::traits::{CoolerBus, RawReading, Settings, UsbDeviceInfo};

const TEMPERATURES: [&str; 4] = ["Inlet", "Outlet", "Sensor #1", "Sensor #2"];

/// Polls one cooler's status frame over HID
pub struct MsiCoolerProbe {
    bus: Arc<dyn CoolerBus>,
    usb: UsbDeviceInfo,
}

impl MsiCoolerProbe {
    pub fn new(bus: Arc<dyn CoolerBus>, usb: UsbDeviceInfo) -> Self {
        Self { bus, usb }
    }

    pub(crate) fn sample(&mut self) -> Result<Vec<RawReading>> {
        let frame = self.bus.read_status(&self.usb)?;
        Ok(readings(&frame))
    }
}

impl fmt::Debug for MsiCoolerProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsiCoolerProbe").field("usb", &self.usb).finish()
    }
}

/// Speed and duty per fan header, then the four temperature probes
pub fn readings(frame: &MsiFanControl) -> Vec<RawReading> {
    let mut readings = Vec::with_capacity(FAN_COUNT * 2 + TEMPERATURES.len());
    for (i, fan) in frame.fans.iter().enumerate() {
        let name = format!("Fan #{}", i + 1);
        readings.push(RawReading::new(SensorType::Fan, i, name.clone(), Some(fan.speed as f32)));
        readings.push(RawReading::new(SensorType::Control, i, name, Some(fan.duty as f32)));
    }
    let temperatures = [
        frame.temperature_inlet,
        frame.temperature_outlet,
        frame.temperature_sensor1,
        frame.temperature_sensor2,
    ];
    for (i, (name, value)) in TEMPERATURES.iter().zip(temperatures).enumerate() {
        readings.push(RawReading::new(SensorType::Temperature, i, *name, Some(value as f32)));
    }
    readings
}

/// Builds the cooler hardware `/msi/{model}/{ordinal}` with its full channel set.
pub(crate) fn build_cooler(
    bus: &Arc<dyn CoolerBus>,
    device: &MsiDevice,
    usb: UsbDeviceInfo,
    ordinal: usize,
    settings: &Arc<dyn Settings>,
) -> Result<Arc<Hardware>> {
    let identifier = Identifier::root(["msi".to_string(), device.device_type.slug().to_string(), ordinal.to_string()])?;
    let path = usb.path.clone();
    let hardware = Hardware::with_probe(
        format!("MSI {}", device.device_type),
        identifier.clone(),
        HardwareType::Cooler,
        Arc::clone(settings),
        Probe::MsiCooler(MsiCoolerProbe::new(Arc::clone(bus), usb)),
    );
    hardware.set_property("vendor_id", format!("0x{:04X}", device.vendor_id));
    hardware.set_property("product_id", format!("0x{:04X}", device.product_id));
    hardware.set_property("protocol_id", format!("0x{:04X}", device.protocol_id));
    hardware.set_property("path", path);

    // Channels exist even while a status read fails, so they are created up front
    for reading in readings(&MsiFanControl::default()) {
        let sensor = Sensor::new(reading.name, reading.index, reading.sensor_type, &identifier, Arc::clone(settings))?;
        hardware.add_sensor(Arc::new(sensor))?;
    }
    hardware.refresh();
    Ok(hardware)
}
