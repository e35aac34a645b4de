//! Memory hardware.
//!
//! The [`MemoryGroup`] always exposes two aggregate entries, virtual memory
//! (`/vram`) and physical memory (`/ram`). When an [`SmbusDriver`] is supplied it
//! additionally looks for SPD-equipped modules on the memory bus. That bus is often
//! not enumerable right after boot, so module detection runs as a background
//! [`Detection`] with retries; found modules appear as `/memory/dimm/{index}`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::types::HardwareType;
use crate::core::Identifier;
use crate::error::Result;
use crate::group::{AttemptOutcome, Detection, Group, HardwareSet, RetryPolicy};
use crate::hardware::{Hardware, Probe};
use crate::report;
use crate::sensor::Sensor;
use crate::traits::{MemoryStatus, ScanResult, Settings, SmbusDriver};

mod dimm;
mod system;

pub use dimm::{dimm_identifier, dimm_name, DimmProbe};
pub use system::{ProcMeminfo, SystemMemoryKind, SystemMemoryProbe};

pub struct MemoryGroup {
    set: Arc<HardwareSet>,
    detection: Detection,
    driver: Option<Arc<dyn SmbusDriver>>,
    driver_opened: Arc<AtomicBool>,
    closed: tokio::sync::Mutex<bool>,
}

impl MemoryGroup {
    /// Creates the aggregate memory hardware and, with a driver, starts module
    /// detection on the current `tokio` runtime.
    ///
    /// # Errors
    ///
    /// [`Error::NotAvailable`](crate::Error::NotAvailable) when a driver is given
    /// outside a runtime, [`Error::InvalidArgument`](crate::Error::InvalidArgument)
    /// for a policy without attempts.
    pub fn new(
        settings: Arc<dyn Settings>,
        status: Arc<dyn MemoryStatus>,
        driver: Option<Arc<dyn SmbusDriver>>,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let set = Arc::new(HardwareSet::new());
        for kind in [SystemMemoryKind::Virtual, SystemMemoryKind::Physical] {
            set.push(system_hardware(kind, &status, &settings)?)?;
        }

        let driver_opened = Arc::new(AtomicBool::new(false));
        let detection = match &driver {
            None => {
                debug!("no SMBus driver, memory modules will not be detected");
                Detection::idle(policy)
            },
            Some(driver) => Detection::spawn(
                policy,
                module_attempt(Arc::clone(driver), Arc::clone(&set), Arc::clone(&settings), Arc::clone(&driver_opened)),
            )?,
        };

        Ok(Self { set, detection, driver, driver_opened, closed: tokio::sync::Mutex::new(false) })
    }
}

fn system_hardware(
    kind: SystemMemoryKind,
    status: &Arc<dyn MemoryStatus>,
    settings: &Arc<dyn Settings>,
) -> Result<Arc<Hardware>> {
    let (name, segment) = kind.hardware();
    let identifier = Identifier::root([segment])?;
    let hardware = Hardware::with_probe(
        name,
        identifier.clone(),
        HardwareType::Memory,
        Arc::clone(settings),
        Probe::SystemMemory(SystemMemoryProbe::new(Arc::clone(status), kind)),
    );
    for (sensor_type, index, name) in kind.channels() {
        let sensor = Sensor::new(name, index, sensor_type, &identifier, Arc::clone(settings))?;
        hardware.add_sensor(Arc::new(sensor))?;
    }
    hardware.refresh();
    Ok(hardware)
}

/// One detection attempt: open the driver if needed, scan, adopt new modules.
fn module_attempt(
    driver: Arc<dyn SmbusDriver>,
    set: Arc<HardwareSet>,
    settings: Arc<dyn Settings>,
    opened: Arc<AtomicBool>,
) -> impl FnMut(u32) -> Result<AttemptOutcome> + Send + 'static {
    move |attempt| {
        if set.is_closed() {
            return Ok(AttemptOutcome::Cancelled);
        }
        if !opened.load(Ordering::SeqCst) {
            driver.open()?;
            opened.store(true, Ordering::SeqCst);
            debug!(attempt, "SMBus driver opened");
        }

        let devices = match driver.scan()? {
            ScanResult::NoDevices => return Ok(AttemptOutcome::NoDevices),
            ScanResult::Devices(devices) if devices.is_empty() => {
                return Ok(AttemptOutcome::NotReady("no memory modules visible on the bus yet".to_string()));
            },
            ScanResult::Devices(devices) => devices,
        };

        let mut found = Vec::with_capacity(devices.len());
        for device in devices {
            if set.contains(&dimm_identifier(device.index)?) {
                continue;
            }
            found.push(dimm::build_dimm(&driver, device, &settings)?);
        }
        Ok(AttemptOutcome::Found(set.extend(found)))
    }
}

#[async_trait]
impl Group for MemoryGroup {
    fn name(&self) -> &str {
        "Memory"
    }

    fn hardware_set(&self) -> &HardwareSet {
        &self.set
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }

    fn report(&self) -> String {
        let mut out = String::from("Memory Report:\n");
        if let Some(error) = self.detection.last_error() {
            out.push_str(&format!("Error while detecting memory: {}\n", error));
        }
        if let Some(exhausted) = self.detection.exhaustion() {
            out.push_str(&format!("{}\n", exhausted));
        }
        for hardware in self.set.snapshot() {
            report::write_hardware(&mut out, &hardware);
        }
        out
    }

    async fn close(&self) {
        let mut closed = self.closed.lock().await;
        if *closed {
            return;
        }
        *closed = true;

        self.detection.cancel_and_wait().await;
        self.set.close_all();

        // The detection task is gone, so nothing can still be using the driver
        if let Some(driver) = &self.driver {
            if self.driver_opened.swap(false, Ordering::SeqCst) {
                if let Err(e) = driver.close() {
                    warn!(error = %e, "closing SMBus driver failed");
                    self.detection.record_error(e);
                }
            }
        }
        info!("memory group closed");
    }
}

impl fmt::Debug for MemoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryGroup")
            .field("hardware", &self.set)
            .field("detection", &self.detection)
            .field("has_driver", &self.driver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests;
