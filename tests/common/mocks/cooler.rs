use hwsense::hardware::controller::msi::MsiFanControl;
use hwsense::traits::{CoolerBus, UsbDeviceInfo};
use hwsense::{Error, Result};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct FakeCoolerBus {
    devices: Vec<UsbDeviceInfo>,
    frame: Mutex<Option<MsiFanControl>>,
}

impl FakeCoolerBus {
    pub fn with_device(mut self, vendor_id: u16, product_id: u16) -> Self {
        let path = format!("/dev/hidraw{}", self.devices.len());
        self.devices.push(UsbDeviceInfo { vendor_id, product_id, path });
        self
    }

    pub fn with_frame(self, frame: MsiFanControl) -> Self {
        *self.frame.lock() = Some(frame);
        self
    }

    /// `None` makes every status read fail
    pub fn set_frame(&self, frame: Option<MsiFanControl>) {
        *self.frame.lock() = frame;
    }
}

impl CoolerBus for FakeCoolerBus {
    fn enumerate(&self) -> Result<Vec<UsbDeviceInfo>> {
        Ok(self.devices.clone())
    }

    fn read_status(&self, device: &UsbDeviceInfo) -> Result<MsiFanControl> {
        (*self.frame.lock()).ok_or_else(|| Error::driver(format!("{} did not answer", device.path)))
    }
}
