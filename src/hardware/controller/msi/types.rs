use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{FAN_CONFIGURE_SIZE, FAN_COUNT};
use crate::error::{Error, Result};

/// Fan curve mode reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MsiFanMode {
    Silent = 0,
    Bios = 1,
    Game = 2,
    Custom = 3,
    #[default]
    Unknown = 4,
    Smart = 5,
}

impl From<u8> for MsiFanMode {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Silent,
            1 => Self::Bios,
            2 => Self::Game,
            3 => Self::Custom,
            5 => Self::Smart,
            _ => Self::Unknown,
        }
    }
}

impl From<MsiFanMode> for u8 {
    fn from(mode: MsiFanMode) -> Self {
        mode as u8
    }
}

impl fmt::Display for MsiFanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Silent => write!(f, "Silent"),
            Self::Bios => write!(f, "BIOS"),
            Self::Game => write!(f, "Game"),
            Self::Custom => write!(f, "Custom"),
            Self::Unknown => write!(f, "Unknown"),
            Self::Smart => write!(f, "Smart"),
        }
    }
}

/// Fan curve record: a mode byte followed by seven curve points.
///
/// With [`MsiFanMode::Custom`] the points are duty percentages or temperatures in
/// degrees Celsius, depending on which curve the record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MsiFanConfigure {
    pub mode: MsiFanMode,
    pub items: [u8; FAN_CONFIGURE_SIZE - 1],
}

impl MsiFanConfigure {
    pub fn to_bytes(&self) -> [u8; FAN_CONFIGURE_SIZE] {
        let mut bytes = [0u8; FAN_CONFIGURE_SIZE];
        bytes[0] = self.mode.into();
        bytes[1..].copy_from_slice(&self.items);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FAN_CONFIGURE_SIZE {
            return Err(Error::invalid_argument(format!(
                "fan configuration is {} bytes, expected {}",
                bytes.len(),
                FAN_CONFIGURE_SIZE
            )));
        }
        let mut items = [0u8; FAN_CONFIGURE_SIZE - 1];
        items.copy_from_slice(&bytes[1..]);
        Ok(Self { mode: MsiFanMode::from(bytes[0]), items })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MsiFan {
    /// RPM
    pub speed: i32,
    /// Percent
    pub duty: i32,
    pub configure_duty: MsiFanConfigure,
    pub configure_temp: MsiFanConfigure,
}

/// Full status frame of one cooler controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MsiFanControl {
    pub fans: [MsiFan; FAN_COUNT],
    pub temperature_inlet: i32,
    pub temperature_outlet: i32,
    pub temperature_sensor1: i32,
    pub temperature_sensor2: i32,
}
