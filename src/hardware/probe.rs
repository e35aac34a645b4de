use crate::error::Result;
use crate::hardware::controller::msi::MsiCoolerProbe;
use crate::hardware::memory::{DimmProbe, SystemMemoryProbe};
use crate::traits::RawReading;

/// Hardware-specific probe step run by [`Hardware::refresh`](super::Hardware::refresh).
///
/// A closed set of device categories; each variant knows how to read its channels.
#[derive(Debug)]
pub enum Probe {
    /// No channels of its own, e.g. a container for sub-hardware. Refresh leaves
    /// manually attached sensors untouched.
    None,
    SystemMemory(SystemMemoryProbe),
    Dimm(DimmProbe),
    MsiCooler(MsiCoolerProbe),
}

impl Probe {
    /// Reads every channel the device currently exposes.
    ///
    /// `None` means the probe does not manage channels; `Some(Err(_))` means the
    /// device could not be read this cycle and existing sensors go unreadable.
    pub(crate) fn sample(&mut self) -> Option<Result<Vec<RawReading>>> {
        match self {
            Probe::None => None,
            Probe::SystemMemory(probe) => Some(probe.sample()),
            Probe::Dimm(probe) => Some(probe.sample()),
            Probe::MsiCooler(probe) => Some(probe.sample()),
        }
    }

    /// Drops the probe's handles on its driver or bus. Called once, when the
    /// hardware closes.
    pub(crate) fn close(&mut self) {
        *self = Probe::None;
    }
}
