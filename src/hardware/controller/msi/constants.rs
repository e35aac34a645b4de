use std::fmt;

/// MSI vendor id used by the MEG line
pub const MSI_VENDOR_ID: u16 = 0x1462;

/// Vendor id of the OEM behind most MSI coolers
pub const OEM_VENDOR_ID: u16 = 0x0DB0;

/// Number of fan headers on one cooler controller
pub const FAN_COUNT: usize = 5;

/// Size of one fan curve configuration record in bytes
pub const FAN_CONFIGURE_SIZE: usize = 8;

/// Cooler models with a known HID protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsiDeviceType {
    S280,
    S360,
    S360Meg,
    X360,
    X240,
    D360,
    D240,
}

impl MsiDeviceType {
    /// Lowercase form used as identifier segment
    pub fn slug(&self) -> &'static str {
        match self {
            Self::S280 => "s280",
            Self::S360 => "s360",
            Self::S360Meg => "s360meg",
            Self::X360 => "x360",
            Self::X240 => "x240",
            Self::D360 => "d360",
            Self::D240 => "d240",
        }
    }
}

impl fmt::Display for MsiDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S280 => write!(f, "S280"),
            Self::S360 => write!(f, "S360"),
            Self::S360Meg => write!(f, "S360 MEG"),
            Self::X360 => write!(f, "X360"),
            Self::X240 => write!(f, "X240"),
            Self::D360 => write!(f, "D360"),
            Self::D240 => write!(f, "D240"),
        }
    }
}

/// One row of the supported device table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsiDevice {
    pub device_type: MsiDeviceType,
    pub vendor_id: u16,
    pub product_id: u16,
    pub protocol_id: u16,
}

impl MsiDevice {
    const fn new(device_type: MsiDeviceType, vendor_id: u16, product_id: u16, protocol_id: u16) -> Self {
        Self { device_type, vendor_id, product_id, protocol_id }
    }
}

pub const SUPPORTED_DEVICES: [MsiDevice; 7] = [
    MsiDevice::new(MsiDeviceType::S280, OEM_VENDOR_ID, 0x75B6, 0x6A04),
    MsiDevice::new(MsiDeviceType::S360, OEM_VENDOR_ID, 0x9BA6, 0x6A05),
    MsiDevice::new(MsiDeviceType::S360Meg, MSI_VENDOR_ID, 0x9BA6, 0x6A05),
    MsiDevice::new(MsiDeviceType::X360, OEM_VENDOR_ID, 0x5259, 0x6A11),
    MsiDevice::new(MsiDeviceType::X240, OEM_VENDOR_ID, 0xC7B2, 0x6A10),
    MsiDevice::new(MsiDeviceType::D360, OEM_VENDOR_ID, 0x8DBF, 0x6A15),
    MsiDevice::new(MsiDeviceType::D240, OEM_VENDOR_ID, 0xD085, 0x6A16),
];

/// Looks up a USB vendor/product pair in [`SUPPORTED_DEVICES`].
pub fn find_device(vendor_id: u16, product_id: u16) -> Option<&'static MsiDevice> {
    SUPPORTED_DEVICES.iter().find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
}
