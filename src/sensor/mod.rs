//! Sensor model
//!
//! A [`Sensor`] is one measurement stream owned by exactly one [`Hardware`]. It keeps
//! the latest value plus the running min/max envelope, and persists its visibility
//! and user-assigned name through the [`Settings`] capability.
//!
//! Sensors are created by the hardware probe that discovers the channel and attached
//! with [`Hardware::add_sensor`]; the owning hardware is the only party that clears
//! the back-reference again.
//!
//! ```rust
//! use std::sync::Arc;
//! use hwsense::core::{Identifier, types::SensorType};
//! use hwsense::sensor::Sensor;
//! use hwsense::settings::MemorySettings;
//!
//! let hw = Identifier::root(["ram"]).unwrap();
//! let sensor = Sensor::new("Memory", 0, SensorType::Load, &hw, Arc::new(MemorySettings::new())).unwrap();
//! sensor.update_value(Some(40.0));
//! sensor.update_value(None);
//! sensor.update_value(Some(55.0));
//! assert_eq!(sensor.value(), Some(55.0));
//! assert_eq!(sensor.min(), Some(40.0));
//! assert_eq!(sensor.max(), Some(55.0));
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::core::types::{SensorLimits, SensorType};
use crate::core::Identifier;
use crate::error::{Error, Result};
use crate::hardware::Hardware;
use crate::traits::{Settings, SettingsExt};

const HIDDEN: &str = "hidden";
const NAME: &str = "name";

#[derive(Debug, Clone)]
struct SensorState {
    name: String,
    value: Option<f32>,
    min: Option<f32>,
    max: Option<f32>,
    visible: bool,
    limits: Option<SensorLimits>,
    critical_limits: Option<SensorLimits>,
}

pub struct Sensor {
    identifier: Identifier,
    index: usize,
    sensor_type: SensorType,
    default_name: String,
    default_hidden: bool,
    settings: Arc<dyn Settings>,
    state: RwLock<SensorState>,
    owner: RwLock<Weak<Hardware>>,
}

impl Sensor {
    /// Creates a detached sensor below `hardware`, identified as
    /// `{hardware}/{sensor_type}/{index}`.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        sensor_type: SensorType,
        hardware: &Identifier,
        settings: Arc<dyn Settings>,
    ) -> Result<Self> {
        let identifier = Identifier::new(Some(hardware), [sensor_type.as_str().to_string(), index.to_string()])?;
        let default_name = name.into();
        let name = settings.get(&identifier.setting_key(NAME), &default_name);
        let visible = !settings.get_bool(&identifier.setting_key(HIDDEN), false);

        Ok(Self {
            identifier,
            index,
            sensor_type,
            default_name,
            default_hidden: false,
            settings,
            state: RwLock::new(SensorState {
                name,
                value: None,
                min: None,
                max: None,
                visible,
                limits: None,
                critical_limits: None,
            }),
            owner: RwLock::new(Weak::new()),
        })
    }

    /// Marks the sensor hidden unless the user stored an explicit choice.
    pub fn hidden_by_default(mut self, hidden: bool) -> Self {
        self.default_hidden = hidden;
        let visible = !self.settings.get_bool(&self.identifier.setting_key(HIDDEN), hidden);
        self.state.get_mut().visible = visible;
        self
    }

    pub fn with_limits(self, limits: SensorLimits) -> Self {
        self.state.write().limits = Some(limits);
        self
    }

    pub fn with_critical_limits(self, limits: SensorLimits) -> Self {
        self.state.write().critical_limits = Some(limits);
        self
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    /// Renames the sensor. A name equal to the probe's default clears the stored override.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        let key = self.identifier.setting_key(NAME);
        if name == self.default_name {
            self.settings.remove(&key);
        } else {
            self.settings.set(&key, &name);
        }
        self.state.write().name = name;
    }

    pub fn value(&self) -> Option<f32> {
        self.state.read().value
    }

    pub fn min(&self) -> Option<f32> {
        self.state.read().min
    }

    pub fn max(&self) -> Option<f32> {
        self.state.read().max
    }

    /// Stores a new reading. Non-null readings widen the min/max envelope; NaN is
    /// treated as an unreadable value. Publishing a change notification is up to
    /// the caller.
    pub fn update_value(&self, value: Option<f32>) {
        let value = value.filter(|v| !v.is_nan());
        let mut state = self.state.write();
        state.value = value;
        if let Some(v) = value {
            state.min = Some(state.min.map_or(v, |m| m.min(v)));
            state.max = Some(state.max.map_or(v, |m| m.max(v)));
        }
    }

    /// Clears the envelope. Only ever triggered explicitly.
    pub fn reset_range(&self) {
        let mut state = self.state.write();
        state.min = None;
        state.max = None;
    }

    pub fn is_visible(&self) -> bool {
        self.state.read().visible
    }

    pub fn is_default_hidden(&self) -> bool {
        self.default_hidden
    }

    /// Updates visibility and persists it as `{identifier}:hidden`.
    pub fn set_visible(&self, visible: bool) {
        self.state.write().visible = visible;
        self.settings.set_bool(&self.identifier.setting_key(HIDDEN), !visible);
    }

    pub fn limits(&self) -> Option<SensorLimits> {
        self.state.read().limits
    }

    pub fn set_limits(&self, limits: Option<SensorLimits>) {
        self.state.write().limits = limits;
    }

    pub fn critical_limits(&self) -> Option<SensorLimits> {
        self.state.read().critical_limits
    }

    pub fn set_critical_limits(&self, limits: Option<SensorLimits>) {
        self.state.write().critical_limits = limits;
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    /// The owning hardware, `None` once the sensor has been removed or its owner closed
    pub fn hardware(&self) -> Option<Arc<Hardware>> {
        self.owner.read().upgrade()
    }

    pub fn is_attached(&self) -> bool {
        self.owner.read().strong_count() > 0
    }

    pub(crate) fn attach(&self, owner: &Arc<Hardware>) -> Result<()> {
        let mut current = self.owner.write();
        if let Some(existing) = current.upgrade() {
            if !Arc::ptr_eq(&existing, owner) {
                return Err(Error::invalid_argument(format!(
                    "sensor {} already belongs to {}",
                    self.identifier,
                    existing.identifier()
                )));
            }
        }
        *current = Arc::downgrade(owner);
        Ok(())
    }

    pub(crate) fn detach(&self) {
        *self.owner.write() = Weak::new();
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Sensor")
            .field("identifier", &self.identifier.to_string())
            .field("name", &state.name)
            .field("sensor_type", &self.sensor_type)
            .field("index", &self.index)
            .field("value", &state.value)
            .field("min", &state.min)
            .field("max", &state.max)
            .field("visible", &state.visible)
            .field("attached", &self.is_attached())
            .finish()
    }
}
