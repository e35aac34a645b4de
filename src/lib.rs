//! hwsense - hardware and sensor discovery with a live device tree
//!
//! This crate keeps a hierarchical model of the hardware in a machine and the
//! measurement channels ("sensors") it exposes, and republishes every change as
//! events so displays, tray icons and diagnostics never talk to drivers directly.
//!
//! # Model
//!
//! - **Identifier**: stable hierarchical key such as `/memory/dimm/0/temperature/0`
//! - **Sensor**: one typed measurement stream with current value and min/max envelope
//! - **Hardware**: a node owning sensors and optional sub-hardware
//! - **Group**: detects all hardware of one category, retrying in the background
//!   when its driver is not ready yet
//! - **Computer**: owns the groups and presents one forest and one event stream
//!
//! Register, SMBus and HID access stay outside the crate, behind the capability
//! traits in [`traits`]. Persisted per-item settings go through the
//! [`Settings`](traits::Settings) trait.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use hwsense::prelude::*;
//! use hwsense::settings::MemorySettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = Arc::new(MemorySettings::new());
//!     let computer = Computer::open(ComputerConfig::default(), Capabilities::new(settings))?;
//!     let (_id, mut events) = computer.subscribe();
//!
//!     computer.refresh();
//!     for hardware in computer.hardware() {
//!         println!("{} ({})", hardware.name(), hardware.identifier());
//!     }
//!
//!     computer.close().await;
//!     while let Ok(event) = events.try_recv() {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Structural mistakes (duplicate identifiers, use after close) come back as
//! [`Error`] values. Detection failures never do: groups record them and expose
//! them through [`Detection::last_error`](group::Detection::last_error) and the
//! diagnostic report. An unreadable channel is a `None` value.
//!
//! # Thread Safety
//!
//! Every type is `Send + Sync`. Structural changes take a per-collection lock and
//! publish their events while holding it; event delivery goes through unbounded
//! channels, so no subscriber code ever runs under an engine lock.

#![doc(html_root_url = "https://docs.rs/hwsense/0.1.0")]

pub mod computer;
pub mod config;
pub mod core;
pub mod error;
pub mod group;
pub mod hardware;
pub mod report;
pub mod sensor;
pub mod settings;
pub mod traits;
pub mod watchlist;

pub use computer::{Capabilities, Computer};
pub use config::ComputerConfig;
pub use crate::core::events::{HardwareEvent, Publisher, SubscriptionId};
pub use crate::core::Identifier;
pub use error::{Error, Result};
pub use hardware::Hardware;
pub use sensor::Sensor;

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::core::types::{HardwareType, SensorLimits, SensorType};
    pub use crate::group::{DetectionState, Group, RetryPolicy};
    pub use crate::traits::{Settings, SettingsExt};
    pub use crate::watchlist::SensorWatchlist;
    pub use crate::{
        Capabilities, Computer, ComputerConfig, Error, Hardware, HardwareEvent, Identifier, Result, Sensor,
    };
}
