//! Sensors pinned for a compact display, such as notification-area icons.
//!
//! Membership is persisted as `{sensor}:tray`; a display colour, if the consumer
//! stores one, lives under `{sensor}:traycolor`. The list follows the hardware
//! tree on its own once [`SensorWatchlist::spawn`] is running: sensors flagged in
//! the settings reappear as soon as their hardware is detected again, and sensors
//! that vanish are dropped without touching their stored flag.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::computer::Computer;
use crate::core::events::{HardwareEvent, SubscriptionId};
use crate::core::Identifier;
use crate::error::{Error, Result};
use crate::hardware::Hardware;
use crate::sensor::Sensor;
use crate::traits::{Settings, SettingsExt};

const TRAY: &str = "tray";
const TRAY_COLOR: &str = "traycolor";

pub struct SensorWatchlist {
    settings: Arc<dyn Settings>,
    entries: Mutex<Vec<Arc<Sensor>>>,
}

impl SensorWatchlist {
    pub fn new(settings: Arc<dyn Settings>) -> Arc<Self> {
        Arc::new(Self { settings, entries: Mutex::new(Vec::new()) })
    }

    /// Pins `sensor`. An entry with the same identifier is kept unless
    /// `replace_existing` is set. Returns whether the list changed.
    pub fn add(&self, sensor: &Arc<Sensor>, replace_existing: bool) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter().position(|s| s.identifier() == sensor.identifier()) {
            Some(_) if !replace_existing => return false,
            Some(i) => entries[i] = Arc::clone(sensor),
            None => entries.push(Arc::clone(sensor)),
        }
        self.settings.set_bool(&sensor.identifier().setting_key(TRAY), true);
        debug!(sensor = %sensor.identifier(), "sensor pinned");
        true
    }

    /// Unpins `sensor` and deletes its stored flag and colour. Returns whether
    /// it was pinned.
    pub fn remove(&self, sensor: &Sensor) -> bool {
        let removed = self.forget(sensor.identifier());
        self.settings.remove(&sensor.identifier().setting_key(TRAY));
        self.settings.remove(&sensor.identifier().setting_key(TRAY_COLOR));
        removed
    }

    /// Drops an entry whose sensor went away, keeping its settings.
    fn forget(&self, identifier: &Identifier) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|s| s.identifier() != identifier);
        entries.len() != before
    }

    fn forget_below(&self, hardware: &Identifier) {
        self.entries.lock().retain(|s| !s.identifier().is_descendant_of(hardware));
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.entries.lock().iter().any(|s| s.identifier() == identifier)
    }

    pub fn sensors(&self) -> Vec<Arc<Sensor>> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether the settings ask for `sensor` to be pinned
    pub fn is_flagged(&self, sensor: &Sensor) -> bool {
        self.settings.get_bool(&sensor.identifier().setting_key(TRAY), false)
    }

    /// Follows `computer` on a background task until [`WatchlistTask::stop`].
    pub fn spawn(self: &Arc<Self>, computer: &Computer) -> Result<WatchlistTask> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::not_available("the watchlist requires a tokio runtime"))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = watch::channel(false);

        // Subscribe before taking the snapshot: hardware added in between shows up
        // twice, which tracking absorbs, but never zero times.
        let computer_subscription = computer.attach(tx.clone());
        let mut tracker = Tracker { list: Arc::clone(self), sender: tx, tracked: HashMap::new() };
        for group in computer.groups() {
            for hardware in group.hardware() {
                tracker.hardware_added(&hardware);
            }
        }

        let publisher = Arc::clone(computer.publisher());
        let task = handle.spawn(async move {
            tracker.run(rx, stop_rx).await;
            publisher.unsubscribe(computer_subscription);
            tracker.untrack_all();
        });
        Ok(WatchlistTask { stop, task })
    }
}

impl fmt::Debug for SensorWatchlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("SensorWatchlist")
            .field("sensors", &entries.iter().map(|s| s.identifier().to_string()).collect::<Vec<_>>())
            .finish()
    }
}

/// Handle of a running [`SensorWatchlist::spawn`]
#[derive(Debug)]
pub struct WatchlistTask {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchlistTask {
    /// Stops following the computer and waits for the task to detach.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "watchlist task ended abnormally");
        }
    }
}

struct Tracker {
    list: Arc<SensorWatchlist>,
    sender: UnboundedSender<HardwareEvent>,
    tracked: HashMap<Identifier, (Arc<Hardware>, SubscriptionId)>,
}

impl Tracker {
    async fn run(&mut self, mut events: UnboundedReceiver<HardwareEvent>, mut stop: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = stop.changed() => break,
            }
        }
    }

    fn handle(&mut self, event: HardwareEvent) {
        match event {
            HardwareEvent::HardwareAdded(hardware) => self.hardware_added(&hardware),
            HardwareEvent::HardwareRemoved(hardware) => self.hardware_removed(&hardware),
            HardwareEvent::SensorAdded { sensor, .. } => {
                if self.list.is_flagged(&sensor) {
                    self.list.add(&sensor, false);
                }
            },
            HardwareEvent::SensorRemoved { sensor, .. } => {
                self.list.forget(sensor.identifier());
            },
            HardwareEvent::ValuesUpdated(_) => {},
        }
    }

    fn hardware_added(&mut self, hardware: &Arc<Hardware>) {
        if !self.tracked.contains_key(hardware.identifier()) {
            let subscription = hardware.publisher().attach(self.sender.clone());
            self.tracked.insert(hardware.identifier().clone(), (Arc::clone(hardware), subscription));
        }
        for sensor in hardware.sensors() {
            if self.list.is_flagged(&sensor) {
                self.list.add(&sensor, false);
            }
        }
        for child in hardware.sub_hardware() {
            self.hardware_added(&child);
        }
    }

    fn hardware_removed(&mut self, hardware: &Arc<Hardware>) {
        let root = hardware.identifier();
        let gone: Vec<Identifier> = self.tracked.keys().filter(|id| *id == root || id.is_descendant_of(root)).cloned().collect();
        for id in gone {
            if let Some((hardware, subscription)) = self.tracked.remove(&id) {
                hardware.publisher().unsubscribe(subscription);
            }
        }
        self.list.forget_below(root);
    }

    fn untrack_all(&mut self) {
        for (_, (hardware, subscription)) in self.tracked.drain() {
            hardware.publisher().unsubscribe(subscription);
        }
    }
}
