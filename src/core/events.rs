//! Event fan-out for the hardware tree.
//!
//! Every [`Hardware`], group and [`Computer`](crate::Computer) owns a [`Publisher`].
//! Subscribers receive [`HardwareEvent`]s over unbounded `tokio` channels, so emitting
//! never blocks and never runs subscriber code. Owners emit structural events while
//! holding the lock of the collection they describe, which keeps delivery order equal
//! to application order.
//!
//! ```rust
//! use hwsense::core::events::Publisher;
//!
//! let publisher = Publisher::new();
//! let (id, _rx) = publisher.subscribe();
//! assert_eq!(publisher.subscriber_count(), 1);
//! assert!(publisher.unsubscribe(id));
//! assert!(!publisher.unsubscribe(id));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};
use crate::hardware::Hardware;
use crate::sensor::Sensor;

/// Notification published by the hardware tree
#[derive(Clone)]
pub enum HardwareEvent {
    HardwareAdded(Arc<Hardware>),
    HardwareRemoved(Arc<Hardware>),
    SensorAdded { hardware: Arc<Hardware>, sensor: Arc<Sensor> },
    SensorRemoved { hardware: Arc<Hardware>, sensor: Arc<Sensor> },
    /// Sensor values of `hardware` changed during a refresh. Always follows the
    /// structural events of the same refresh.
    ValuesUpdated(Arc<Hardware>),
}

impl HardwareEvent {
    /// The hardware the event is about (the owner, for sensor events)
    pub fn hardware(&self) -> &Arc<Hardware> {
        match self {
            HardwareEvent::HardwareAdded(hardware)
            | HardwareEvent::HardwareRemoved(hardware)
            | HardwareEvent::ValuesUpdated(hardware) => hardware,
            HardwareEvent::SensorAdded { hardware, .. } | HardwareEvent::SensorRemoved { hardware, .. } => hardware,
        }
    }

    /// HardwareAdded / HardwareRemoved, the only kinds forwarded by relays
    pub fn is_hardware_structural(&self) -> bool {
        matches!(self, HardwareEvent::HardwareAdded(_) | HardwareEvent::HardwareRemoved(_))
    }
}

impl fmt::Debug for HardwareEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareEvent::HardwareAdded(h) => write!(f, "HardwareAdded({})", h.identifier()),
            HardwareEvent::HardwareRemoved(h) => write!(f, "HardwareRemoved({})", h.identifier()),
            HardwareEvent::SensorAdded { sensor, .. } => write!(f, "SensorAdded({})", sensor.identifier()),
            HardwareEvent::SensorRemoved { sensor, .. } => write!(f, "SensorRemoved({})", sensor.identifier()),
            HardwareEvent::ValuesUpdated(h) => write!(f, "ValuesUpdated({})", h.identifier()),
        }
    }
}

/// Handle returned by every subscription; pass it back to [`Publisher::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Sink {
    Channel(UnboundedSender<HardwareEvent>),
    /// Forwards HardwareAdded/HardwareRemoved into another publisher
    Relay(Arc<Publisher>),
}

struct Entry {
    id: SubscriptionId,
    sink: Sink,
}

/// Observer registry for one event source
pub struct Publisher {
    sinks: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher {
    pub fn new() -> Self {
        Self { sinks: Mutex::new(Vec::new()), next_id: AtomicU64::new(1) }
    }

    fn register(&self, sink: Sink) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks.lock().push(Entry { id, sink });
        id
    }

    /// Opens a new channel receiving every future event.
    pub fn subscribe(&self) -> (SubscriptionId, UnboundedReceiver<HardwareEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.attach(tx), rx)
    }

    /// Delivers every future event to an existing sender. One sender may be
    /// attached to many publishers to merge their streams.
    pub fn attach(&self, sender: UnboundedSender<HardwareEvent>) -> SubscriptionId {
        self.register(Sink::Channel(sender))
    }

    /// Forwards future HardwareAdded/HardwareRemoved events into `target`.
    pub fn relay(&self, target: &Arc<Publisher>) -> Result<SubscriptionId> {
        if std::ptr::eq(self, Arc::as_ptr(target)) {
            return Err(Error::invalid_argument("a publisher cannot relay into itself"));
        }
        Ok(self.register(Sink::Relay(Arc::clone(target))))
    }

    /// Removes a subscription. Returns false when it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut sinks = self.sinks.lock();
        let before = sinks.len();
        sinks.retain(|entry| entry.id != id);
        sinks.len() != before
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        self.sinks.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Delivers `event` to every sink. Channels whose receiver is gone are pruned.
    pub fn emit(&self, event: HardwareEvent) {
        let mut sinks = self.sinks.lock();
        sinks.retain(|entry| match &entry.sink {
            Sink::Channel(tx) => tx.send(event.clone()).is_ok(),
            Sink::Relay(target) => {
                if event.is_hardware_structural() {
                    target.emit(event.clone());
                }
                true
            },
        });
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher").field("subscribers", &self.subscriber_count()).finish()
    }
}
