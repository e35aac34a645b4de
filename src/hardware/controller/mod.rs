//! Peripheral controllers found on USB.
//!
//! Detection is a single synchronous enumeration of the [`CoolerBus`]: HID access
//! is available as soon as the process runs, so there is nothing to wait for.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::group::{AttemptOutcome, Detection, Group, HardwareSet, RetryPolicy};
use crate::hardware::Hardware;
use crate::report;
use crate::traits::{CoolerBus, Settings};

pub mod msi;

pub struct ControllerGroup {
    set: HardwareSet,
    detection: Detection,
    closed: AtomicBool,
}

impl ControllerGroup {
    pub fn new(settings: Arc<dyn Settings>, bus: Option<Arc<dyn CoolerBus>>) -> Self {
        let set = HardwareSet::new();
        let detection = match bus {
            None => Detection::idle(RetryPolicy::default()),
            Some(bus) => {
                let result = detect(&bus, &settings).map(|coolers| {
                    let count = set.extend(coolers);
                    if count == 0 {
                        AttemptOutcome::NoDevices
                    } else {
                        AttemptOutcome::Found(count)
                    }
                });
                if let Err(e) = &result {
                    warn!(error = %e, "cooler enumeration failed");
                }
                Detection::settled(result)
            },
        };
        Self { set, detection, closed: AtomicBool::new(false) }
    }
}

fn detect(bus: &Arc<dyn CoolerBus>, settings: &Arc<dyn Settings>) -> Result<Vec<Arc<Hardware>>> {
    let mut ordinals: HashMap<msi::MsiDeviceType, usize> = HashMap::new();
    let mut coolers = Vec::new();
    for usb in bus.enumerate()? {
        let Some(device) = msi::find_device(usb.vendor_id, usb.product_id) else {
            continue;
        };
        let ordinal = ordinals.entry(device.device_type).or_insert(0);
        debug!(model = %device.device_type, path = %usb.path, "MSI cooler found");
        coolers.push(msi::build_cooler(bus, device, usb, *ordinal, settings)?);
        *ordinal += 1;
    }
    Ok(coolers)
}

#[async_trait]
impl Group for ControllerGroup {
    fn name(&self) -> &str {
        "Controller"
    }

    fn hardware_set(&self) -> &HardwareSet {
        &self.set
    }

    fn detection(&self) -> &Detection {
        &self.detection
    }

    fn report(&self) -> String {
        let mut out = String::from("Controller Report:\n");
        if let Some(error) = self.detection.last_error() {
            out.push_str(&format!("Error while detecting controllers: {}\n", error));
        }
        for hardware in self.set.snapshot() {
            report::write_hardware(&mut out, &hardware);
        }
        out
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.detection.cancel_and_wait().await;
        self.set.close_all();
        info!("controller group closed");
    }
}

impl fmt::Debug for ControllerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerGroup").field("hardware", &self.set).field("detection", &self.detection).finish()
    }
}
