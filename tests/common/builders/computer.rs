use std::sync::Arc;

use hwsense::core::types::SensorType;
use hwsense::settings::MemorySettings;
use hwsense::traits::{CoolerBus, DeviceDescriptor, RawReading, SmbusDriver};
use hwsense::{Capabilities, Computer, ComputerConfig, Result};

use crate::common::mocks::FixedMemoryStatus;

/// Builder for computers wired to fake capabilities
pub struct TestComputerBuilder {
    settings: Arc<MemorySettings>,
    config: ComputerConfig,
    smbus: Option<Arc<dyn SmbusDriver>>,
    cooler_bus: Option<Arc<dyn CoolerBus>>,
}

impl Default for TestComputerBuilder {
    fn default() -> Self {
        Self {
            settings: Arc::new(MemorySettings::new()),
            config: ComputerConfig { controller_enabled: false, ..ComputerConfig::default() },
            smbus: None,
            cooler_bus: None,
        }
    }
}

impl TestComputerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: Arc<MemorySettings>) -> Self {
        self.settings = settings;
        self
    }

    pub fn smbus(mut self, driver: Arc<dyn SmbusDriver>) -> Self {
        self.smbus = Some(driver);
        self
    }

    pub fn cooler_bus(mut self, bus: Arc<dyn CoolerBus>) -> Self {
        self.config.controller_enabled = true;
        self.cooler_bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<Computer> {
        let mut capabilities = Capabilities::new(self.settings).with_memory_status(Arc::new(FixedMemoryStatus::default()));
        capabilities.smbus = self.smbus;
        capabilities.cooler_bus = self.cooler_bus;
        Computer::open(self.config, capabilities)
    }
}

/// Two modules as a memory bus scan reports them
pub fn two_modules() -> Vec<DeviceDescriptor> {
    vec![
        DeviceDescriptor::new(0, 0x50).with_part("Corsair", "CMK32GX4M2E3200C16"),
        DeviceDescriptor::new(2, 0x52).with_part("Corsair", "CMK32GX4M2E3200C16"),
    ]
}

pub fn dimm_temperatures(celsius: &[f32]) -> Vec<RawReading> {
    celsius
        .iter()
        .enumerate()
        .map(|(i, c)| RawReading::new(SensorType::Temperature, i, format!("DIMM Sensor #{}", i), Some(*c)))
        .collect()
}
