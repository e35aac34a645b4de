//! Hardware nodes of the device tree.
//!
//! A [`Hardware`] owns an ordered list of [`Sensor`]s and an ordered list of child
//! hardware. All structural changes happen under the node's lock and are published
//! on its [`Publisher`] while that lock is held, so subscribers see them in the
//! order they were applied. Readers always get a copied snapshot.
//!
//! The device categories live in submodules:
//!
//! - `memory` - physical / virtual memory totals and SPD-equipped DIMMs
//! - `controller` - USB liquid cooler controllers
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hwsense::core::{Identifier, types::{HardwareType, SensorType}};
//! use hwsense::hardware::Hardware;
//! use hwsense::sensor::Sensor;
//! use hwsense::settings::MemorySettings;
//!
//! let settings = Arc::new(MemorySettings::new());
//! let id = Identifier::root(["board"]).unwrap();
//! let board = Hardware::new("Mainboard", id.clone(), HardwareType::Motherboard, settings.clone());
//! let vcore = Sensor::new("Vcore", 0, SensorType::Voltage, &id, settings).unwrap();
//! board.add_sensor(Arc::new(vcore)).unwrap();
//! assert_eq!(board.sensors().len(), 1);
//! ```
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::core::events::{HardwareEvent, Publisher, SubscriptionId};
use crate::core::types::{HardwareType, SensorType};
use crate::core::Identifier;
use crate::error::{Error, Result};
use crate::sensor::Sensor;
use crate::traits::Settings;

/// Cooler controllers
pub mod controller;
/// Memory hardware and the memory group
pub mod memory;
mod probe;

pub use probe::Probe;

const NAME: &str = "name";

struct Child {
    hardware: Arc<Hardware>,
    relay: SubscriptionId,
}

#[derive(Default)]
struct HardwareInner {
    sensors: Vec<Arc<Sensor>>,
    children: Vec<Child>,
    closed: bool,
}

pub struct Hardware {
    identifier: Identifier,
    hardware_type: HardwareType,
    default_name: String,
    settings: Arc<dyn Settings>,
    me: Weak<Hardware>,
    name: RwLock<String>,
    properties: RwLock<BTreeMap<String, String>>,
    parent: RwLock<Weak<Hardware>>,
    inner: Mutex<HardwareInner>,
    // Held for the whole of a refresh, which serializes refreshes and lets close
    // wait for an in-flight one.
    probe: Mutex<Probe>,
    publisher: Arc<Publisher>,
}

impl Hardware {
    /// Hardware without a probe; sensors are attached by hand.
    pub fn new(
        name: impl Into<String>,
        identifier: Identifier,
        hardware_type: HardwareType,
        settings: Arc<dyn Settings>,
    ) -> Arc<Self> {
        Self::with_probe(name, identifier, hardware_type, settings, Probe::None)
    }

    pub fn with_probe(
        name: impl Into<String>,
        identifier: Identifier,
        hardware_type: HardwareType,
        settings: Arc<dyn Settings>,
        probe: Probe,
    ) -> Arc<Self> {
        let default_name = name.into();
        let name = settings.get(&identifier.setting_key(NAME), &default_name);
        Arc::new_cyclic(|me| Self {
            identifier,
            hardware_type,
            default_name,
            settings,
            me: me.clone(),
            name: RwLock::new(name),
            properties: RwLock::new(BTreeMap::new()),
            parent: RwLock::new(Weak::new()),
            inner: Mutex::new(HardwareInner::default()),
            probe: Mutex::new(probe),
            publisher: Arc::new(Publisher::new()),
        })
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn hardware_type(&self) -> HardwareType {
        self.hardware_type
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Renames the hardware, persisting the override under `{identifier}:name`.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        let key = self.identifier.setting_key(NAME);
        if name == self.default_name {
            self.settings.remove(&key);
        } else {
            self.settings.set(&key, &name);
        }
        *self.name.write() = name;
    }

    /// Descriptive key/value pairs (part numbers, bus addresses, ...)
    pub fn properties(&self) -> BTreeMap<String, String> {
        self.properties.read().clone()
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    /// Events about this node: its sensors, its children, and (relayed) deeper
    /// HardwareAdded/HardwareRemoved.
    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// Snapshot of the sensors, sorted by `(type, index)`
    pub fn sensors(&self) -> Vec<Arc<Sensor>> {
        self.inner.lock().sensors.clone()
    }

    pub fn sensor(&self, identifier: &Identifier) -> Option<Arc<Sensor>> {
        self.inner.lock().sensors.iter().find(|s| s.identifier() == identifier).cloned()
    }

    /// Snapshot of the direct children
    pub fn sub_hardware(&self) -> Vec<Arc<Hardware>> {
        self.inner.lock().children.iter().map(|c| Arc::clone(&c.hardware)).collect()
    }

    pub fn parent(&self) -> Option<Arc<Hardware>> {
        self.parent.read().upgrade()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    fn this(&self) -> Result<Arc<Hardware>> {
        self.me.upgrade().ok_or_else(|| Error::closed(self.identifier.to_string()))
    }

    /// Attaches `sensor` in `(type, index)` order and raises SensorAdded.
    pub fn add_sensor(&self, sensor: Arc<Sensor>) -> Result<()> {
        let me = self.this()?;
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::closed(self.identifier.to_string()));
        }
        self.insert_sensor(&mut inner, &me, sensor)
    }

    fn insert_sensor(&self, inner: &mut HardwareInner, me: &Arc<Hardware>, sensor: Arc<Sensor>) -> Result<()> {
        if inner.sensors.iter().any(|s| s.identifier() == sensor.identifier()) {
            return Err(Error::duplicate_identifier(sensor.identifier().to_string()));
        }
        sensor.attach(me)?;
        let key = (sensor.sensor_type(), sensor.index());
        let position = inner.sensors.partition_point(|s| (s.sensor_type(), s.index()) <= key);
        inner.sensors.insert(position, Arc::clone(&sensor));
        debug!(hardware = %self.identifier, sensor = %sensor.identifier(), "sensor added");
        self.publisher.emit(HardwareEvent::SensorAdded { hardware: Arc::clone(me), sensor });
        Ok(())
    }

    /// Detaches the sensor and raises SensorRemoved. Absent sensors are a no-op.
    pub fn remove_sensor(&self, identifier: &Identifier) -> Option<Arc<Sensor>> {
        let me = self.me.upgrade()?;
        let mut inner = self.inner.lock();
        let position = inner.sensors.iter().position(|s| s.identifier() == identifier)?;
        let sensor = inner.sensors.remove(position);
        self.retire_sensor(&me, &sensor);
        Some(sensor)
    }

    fn retire_sensor(&self, me: &Arc<Hardware>, sensor: &Arc<Sensor>) {
        sensor.detach();
        debug!(hardware = %self.identifier, sensor = %sensor.identifier(), "sensor removed");
        self.publisher.emit(HardwareEvent::SensorRemoved { hardware: Arc::clone(me), sensor: Arc::clone(sensor) });
    }

    /// Attaches a child node and raises HardwareAdded. The child's own
    /// HardwareAdded/HardwareRemoved events are relayed here while attached.
    ///
    /// The child's identifier must lie below this node's, which keeps identifiers
    /// unique across a tree whose roots are distinct. A node can never become the
    /// child of its own descendant.
    pub fn add_sub_hardware(&self, child: Arc<Hardware>) -> Result<()> {
        let me = self.this()?;
        if Arc::ptr_eq(&me, &child) {
            return Err(Error::invalid_argument("hardware cannot be its own child"));
        }
        let mut ancestor = Some(Arc::clone(&me));
        while let Some(node) = ancestor {
            if Arc::ptr_eq(&node, &child) {
                return Err(Error::invalid_argument(format!(
                    "{} is an ancestor of {}",
                    child.identifier(),
                    self.identifier
                )));
            }
            ancestor = node.parent();
        }
        if !child.identifier().is_descendant_of(&self.identifier) {
            return Err(Error::invalid_argument(format!(
                "{} does not lie below {}",
                child.identifier(),
                self.identifier
            )));
        }
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::closed(self.identifier.to_string()));
        }
        if inner.children.iter().any(|c| c.hardware.identifier() == child.identifier()) {
            return Err(Error::duplicate_identifier(child.identifier().to_string()));
        }
        {
            let mut parent = child.parent.write();
            if let Some(existing) = parent.upgrade() {
                return Err(Error::invalid_argument(format!(
                    "{} is already attached to {}",
                    child.identifier(),
                    existing.identifier()
                )));
            }
            *parent = Arc::downgrade(&me);
        }
        let relay = child.publisher.relay(&self.publisher)?;
        inner.children.push(Child { hardware: Arc::clone(&child), relay });
        debug!(parent = %self.identifier, hardware = %child.identifier(), "sub-hardware added");
        self.publisher.emit(HardwareEvent::HardwareAdded(child));
        Ok(())
    }

    /// Detaches a child and raises HardwareRemoved. The child stays open; closing it
    /// is up to the caller. Absent children are a no-op.
    pub fn remove_sub_hardware(&self, identifier: &Identifier) -> Option<Arc<Hardware>> {
        let mut inner = self.inner.lock();
        let position = inner.children.iter().position(|c| c.hardware.identifier() == identifier)?;
        let child = inner.children.remove(position);
        child.hardware.publisher.unsubscribe(child.relay);
        *child.hardware.parent.write() = Weak::new();
        debug!(parent = %self.identifier, hardware = %identifier, "sub-hardware removed");
        self.publisher.emit(HardwareEvent::HardwareRemoved(Arc::clone(&child.hardware)));
        Some(child.hardware)
    }

    /// Runs one probe step.
    ///
    /// Channels that vanished are removed and new ones added first; values are
    /// written afterwards and announced with a single ValuesUpdated. A channel that
    /// could not be read gets a `None` value without affecting its siblings.
    pub fn refresh(&self) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let mut probe = self.probe.lock();
        if self.inner.lock().closed {
            return;
        }

        let readings = match probe.sample() {
            None => return,
            Some(Ok(readings)) => Some(readings),
            Some(Err(e)) => {
                debug!(hardware = %self.identifier, error = %e, "probe failed, values unreadable this cycle");
                None
            },
        };

        let sensors = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            if let Some(readings) = &readings {
                self.reconcile(&mut inner, &me, readings);
            }
            inner.sensors.clone()
        };

        let values: HashMap<(SensorType, usize), Option<f32>> = readings
            .iter()
            .flatten()
            .map(|r| ((r.sensor_type, r.index), r.value))
            .collect();
        for sensor in &sensors {
            let value = values.get(&(sensor.sensor_type(), sensor.index())).copied().flatten();
            sensor.update_value(value);
        }
        self.publisher.emit(HardwareEvent::ValuesUpdated(me));
    }

    fn reconcile(&self, inner: &mut HardwareInner, me: &Arc<Hardware>, readings: &[crate::traits::RawReading]) {
        let present: HashMap<(SensorType, usize), &crate::traits::RawReading> =
            readings.iter().map(|r| ((r.sensor_type, r.index), r)).collect();

        let (kept, gone): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.sensors)
            .into_iter()
            .partition(|s| present.contains_key(&(s.sensor_type(), s.index())));
        inner.sensors = kept;
        for sensor in &gone {
            self.retire_sensor(me, sensor);
        }

        for reading in readings {
            let known = inner.sensors.iter().any(|s| s.sensor_type() == reading.sensor_type && s.index() == reading.index);
            if known {
                continue;
            }
            let created = Sensor::new(
                reading.name.clone(),
                reading.index,
                reading.sensor_type,
                &self.identifier,
                Arc::clone(&self.settings),
            )
            .and_then(|sensor| self.insert_sensor(inner, me, Arc::new(sensor)));
            if let Err(e) = created {
                warn!(hardware = %self.identifier, channel = %reading.name, error = %e, "could not add sensor");
            }
        }
    }

    /// Closes the node and its children, releasing the probe. Sensors are detached
    /// before this returns. Idempotent.
    pub fn close(&self) {
        let mut probe = self.probe.lock();
        let (sensors, children) = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            (std::mem::take(&mut inner.sensors), std::mem::take(&mut inner.children))
        };
        for sensor in &sensors {
            sensor.detach();
        }
        for child in children {
            child.hardware.publisher.unsubscribe(child.relay);
            *child.hardware.parent.write() = Weak::new();
            child.hardware.close();
        }
        probe.close();
        debug!(hardware = %self.identifier, "hardware closed");
    }
}

impl fmt::Debug for Hardware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Hardware")
            .field("identifier", &self.identifier.to_string())
            .field("name", &*self.name.read())
            .field("hardware_type", &self.hardware_type)
            .field("sensors", &inner.sensors.len())
            .field("sub_hardware", &inner.children.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
