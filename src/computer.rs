//! The aggregate root.
//!
//! A [`Computer`] owns the groups of one monitoring session. It presents their
//! hardware as a single forest and republishes every top-level HardwareAdded /
//! HardwareRemoved on its own [`Publisher`]: each hardware is announced exactly
//! once, including hardware a group already had when it was added, and removed
//! exactly once when the group goes away.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hwsense::{Capabilities, Computer, ComputerConfig};
//! use hwsense::settings::MemorySettings;
//!
//! #[tokio::main]
//! async fn main() -> hwsense::Result<()> {
//!     let computer = Computer::open(ComputerConfig::default(), Capabilities::new(Arc::new(MemorySettings::new())))?;
//!     computer.refresh();
//!     println!("{}", computer.report());
//!     computer.close().await;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::config::ComputerConfig;
use crate::core::events::{HardwareEvent, Publisher, SubscriptionId};
use crate::error::{Error, Result};
use crate::group::{Group, IdentifierClaims};
use crate::hardware::controller::ControllerGroup;
use crate::hardware::memory::{MemoryGroup, ProcMeminfo};
use crate::hardware::Hardware;
use crate::report::HardwareSnapshot;
use crate::traits::{CoolerBus, MemoryStatus, Settings, SmbusDriver};

/// Platform access handed to [`Computer::open`]
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub settings: Arc<dyn Settings>,
    pub memory_status: Arc<dyn MemoryStatus>,
    /// SPD access for memory module detection
    pub smbus: Option<Arc<dyn SmbusDriver>>,
    /// HID access for cooler controllers
    pub cooler_bus: Option<Arc<dyn CoolerBus>>,
}

impl Capabilities {
    /// Memory figures from `/proc/meminfo`, no drivers.
    pub fn new(settings: Arc<dyn Settings>) -> Self {
        Self { settings, memory_status: Arc::new(ProcMeminfo::new()), smbus: None, cooler_bus: None }
    }

    pub fn with_memory_status(mut self, status: Arc<dyn MemoryStatus>) -> Self {
        self.memory_status = status;
        self
    }

    pub fn with_smbus(mut self, driver: Arc<dyn SmbusDriver>) -> Self {
        self.smbus = Some(driver);
        self
    }

    pub fn with_cooler_bus(mut self, bus: Arc<dyn CoolerBus>) -> Self {
        self.cooler_bus = Some(bus);
        self
    }
}

struct AttachedGroup {
    group: Arc<dyn Group>,
    relay: SubscriptionId,
}

#[derive(Default)]
struct ComputerInner {
    groups: Vec<AttachedGroup>,
    closed: bool,
}

pub struct Computer {
    settings: Arc<dyn Settings>,
    inner: Mutex<ComputerInner>,
    publisher: Arc<Publisher>,
    claims: Arc<IdentifierClaims>,
    // Serializes close() so a second caller returns only once everything is released
    closing: tokio::sync::Mutex<()>,
}

impl Computer {
    /// An empty computer; groups are added with [`add_group`](Self::add_group).
    pub fn new(settings: Arc<dyn Settings>) -> Self {
        Self {
            settings,
            inner: Mutex::new(ComputerInner::default()),
            publisher: Arc::new(Publisher::new()),
            claims: Arc::new(IdentifierClaims::new()),
            closing: tokio::sync::Mutex::new(()),
        }
    }

    /// Opens every group enabled in `config`.
    ///
    /// # Errors
    ///
    /// Fails for an invalid retry policy, or when an SMBus driver is supplied
    /// outside a `tokio` runtime.
    pub fn open(config: ComputerConfig, capabilities: Capabilities) -> Result<Self> {
        config.validate()?;
        let computer = Self::new(Arc::clone(&capabilities.settings));

        if config.memory_enabled {
            let group = MemoryGroup::new(
                Arc::clone(&capabilities.settings),
                capabilities.memory_status,
                capabilities.smbus,
                config.detection,
            )?;
            computer.add_group(Arc::new(group))?;
        }
        if config.controller_enabled {
            let group = ControllerGroup::new(Arc::clone(&capabilities.settings), capabilities.cooler_bus);
            computer.add_group(Arc::new(group))?;
        }

        info!(groups = computer.groups().len(), "computer opened");
        Ok(computer)
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    /// Takes ownership of `group`. HardwareAdded is raised for hardware the group
    /// already holds, then for everything it adds later.
    ///
    /// Top-level identifiers are unique across groups: a group holding one that
    /// overlaps another group's is refused with `DuplicateIdentifier`, and such
    /// hardware found later is closed instead of adopted.
    pub fn add_group(&self, group: Arc<dyn Group>) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::closed("computer"));
        }
        let relay = group.hardware_set().attach_relay(&self.publisher, &self.claims)?;
        debug!(group = group.name(), "group added");
        inner.groups.push(AttachedGroup { group, relay });
        Ok(())
    }

    pub fn groups(&self) -> Vec<Arc<dyn Group>> {
        self.inner.lock().groups.iter().map(|g| Arc::clone(&g.group)).collect()
    }

    /// Every hardware: groups in order, each top-level hardware followed
    /// depth-first by its sub-hardware.
    pub fn hardware(&self) -> Vec<Arc<Hardware>> {
        let mut out = Vec::new();
        for group in self.groups() {
            for hardware in group.hardware() {
                collect(&hardware, &mut out);
            }
        }
        out
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn subscribe(&self) -> (SubscriptionId, UnboundedReceiver<HardwareEvent>) {
        self.publisher.subscribe()
    }

    pub fn attach(&self, sender: UnboundedSender<HardwareEvent>) -> SubscriptionId {
        self.publisher.attach(sender)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.publisher.unsubscribe(id)
    }

    /// One polling pass over [`hardware`](Self::hardware).
    pub fn refresh(&self) {
        for hardware in self.hardware() {
            hardware.refresh();
        }
    }

    /// Every group's report, in group order
    pub fn report(&self) -> String {
        self.groups().iter().map(|g| g.report()).collect::<Vec<_>>().join("\n")
    }

    pub fn snapshot(&self) -> Vec<HardwareSnapshot> {
        self.groups()
            .iter()
            .flat_map(|g| g.hardware())
            .map(|h| HardwareSnapshot::capture(&h))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Closes every group in order. Each group's hardware is announced as removed
    /// before the group releases it. Idempotent.
    pub async fn close(&self) {
        let _closing = self.closing.lock().await;
        let groups = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            std::mem::take(&mut inner.groups)
        };

        for attached in groups {
            // Detection may still adopt hardware; it must be announced before the
            // relay goes away.
            attached.group.detection().cancel_and_wait().await;
            for hardware in attached.group.hardware_set().detach_relay(attached.relay) {
                self.publisher.emit(HardwareEvent::HardwareRemoved(hardware));
            }
            attached.group.close().await;
            debug!(group = attached.group.name(), "group closed");
        }
        info!("computer closed");
    }
}

fn collect(hardware: &Arc<Hardware>, out: &mut Vec<Arc<Hardware>>) {
    out.push(Arc::clone(hardware));
    for child in hardware.sub_hardware() {
        collect(&child, out);
    }
}

impl fmt::Debug for Computer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Computer")
            .field("groups", &inner.groups.iter().map(|g| g.group.name().to_string()).collect::<Vec<_>>())
            .field("closed", &inner.closed)
            .finish()
    }
}
