//! Detection units.
//!
//! A [`Group`] owns every top-level [`Hardware`] of one category and, where the
//! category depends on a slow driver, the [`Detection`] that discovers it. The
//! hardware itself lives in a [`HardwareSet`], which also carries the group-level
//! HardwareAdded/HardwareRemoved events the [`Computer`](crate::Computer) relays.

use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::core::events::{HardwareEvent, Publisher, SubscriptionId};
use crate::core::Identifier;
use crate::error::{Error, Result};
use crate::hardware::Hardware;

pub mod detection;

pub use detection::{AttemptOutcome, Detection, DetectionState, RetryPolicy};

/// A detector and owner for all hardware of one category
#[async_trait]
pub trait Group: Debug + Send + Sync {
    /// Short category name, e.g. "Memory"
    fn name(&self) -> &str;

    fn hardware_set(&self) -> &HardwareSet;

    /// Snapshot of the top-level hardware in discovery order
    fn hardware(&self) -> Vec<Arc<Hardware>> {
        self.hardware_set().snapshot()
    }

    fn detection(&self) -> &Detection;

    /// Human-readable state for troubleshooting. Must not fail when detection did.
    fn report(&self) -> String;

    /// Cancels detection, waits for it, then closes and drops every hardware.
    /// Idempotent; errors are recorded, never returned.
    async fn close(&self);
}

/// Top-level identifiers taken by the hardware sets attached to one owner.
///
/// No claimed identifier may equal, contain or lie below another one. Together
/// with sub-hardware always living below its parent, this keeps identifiers
/// unique across the whole forest.
#[derive(Debug, Default)]
pub struct IdentifierClaims {
    claimed: Mutex<Vec<Identifier>>,
}

impl IdentifierClaims {
    pub fn new() -> Self {
        Self::default()
    }

    fn overlap<'a>(claimed: &'a [Identifier], identifier: &Identifier) -> Option<&'a Identifier> {
        claimed
            .iter()
            .find(|c| *c == identifier || c.is_descendant_of(identifier) || identifier.is_descendant_of(c))
    }

    /// Takes `identifier`, failing with `DuplicateIdentifier` when it overlaps a
    /// claimed one.
    pub fn claim(&self, identifier: &Identifier) -> Result<()> {
        self.claim_all(std::slice::from_ref(identifier))
    }

    /// Takes every identifier or none of them.
    pub fn claim_all(&self, identifiers: &[Identifier]) -> Result<()> {
        let mut claimed = self.claimed.lock();
        for (i, identifier) in identifiers.iter().enumerate() {
            let taken = Self::overlap(&claimed, identifier).or_else(|| Self::overlap(&identifiers[..i], identifier));
            if let Some(existing) = taken {
                return Err(Error::duplicate_identifier(format!("{} overlaps {}", identifier, existing)));
            }
        }
        claimed.extend(identifiers.iter().cloned());
        Ok(())
    }

    pub fn release(&self, identifier: &Identifier) {
        self.claimed.lock().retain(|c| c != identifier);
    }

    pub fn is_claimed(&self, identifier: &Identifier) -> bool {
        self.claimed.lock().contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.lock().is_empty()
    }
}

#[derive(Default)]
struct SetInner {
    hardware: Vec<Arc<Hardware>>,
    claims: Option<Arc<IdentifierClaims>>,
    closed: bool,
}

impl SetInner {
    fn release_all(&mut self) {
        if let Some(claims) = self.claims.take() {
            for hardware in &self.hardware {
                claims.release(hardware.identifier());
            }
        }
    }
}

/// Ordered, lock-protected collection of top-level hardware
pub struct HardwareSet {
    inner: Mutex<SetInner>,
    publisher: Arc<Publisher>,
}

impl Default for HardwareSet {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareSet {
    pub fn new() -> Self {
        Self { inner: Mutex::new(SetInner::default()), publisher: Arc::new(Publisher::new()) }
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn snapshot(&self) -> Vec<Arc<Hardware>> {
        self.inner.lock().hardware.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().hardware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().hardware.is_empty()
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.inner.lock().hardware.iter().any(|h| h.identifier() == identifier)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Appends one hardware and raises HardwareAdded.
    pub fn push(&self, hardware: Arc<Hardware>) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(Error::closed("hardware set"));
        }
        if inner.hardware.iter().any(|h| h.identifier() == hardware.identifier()) {
            return Err(Error::duplicate_identifier(hardware.identifier().to_string()));
        }
        if let Some(claims) = &inner.claims {
            claims.claim(hardware.identifier())?;
        }
        inner.hardware.push(Arc::clone(&hardware));
        debug!(hardware = %hardware.identifier(), "hardware added");
        self.publisher.emit(HardwareEvent::HardwareAdded(hardware));
        Ok(())
    }

    /// Appends every hardware whose identifier is not present yet, raising one
    /// HardwareAdded each. Returns how many were adopted.
    ///
    /// Hardware offered after the set was closed, or whose identifier is already
    /// claimed elsewhere in the forest, is closed instead of adopted.
    pub fn extend(&self, hardware: impl IntoIterator<Item = Arc<Hardware>>) -> usize {
        let mut rejected = Vec::new();
        let mut added = 0;
        {
            let mut inner = self.inner.lock();
            for hw in hardware {
                if inner.closed {
                    rejected.push(hw);
                    continue;
                }
                if inner.hardware.iter().any(|h| h.identifier() == hw.identifier()) {
                    debug!(hardware = %hw.identifier(), "hardware already present, skipped");
                    continue;
                }
                if let Some(claims) = &inner.claims {
                    if let Err(e) = claims.claim(hw.identifier()) {
                        warn!(hardware = %hw.identifier(), error = %e, "hardware rejected");
                        rejected.push(hw);
                        continue;
                    }
                }
                inner.hardware.push(Arc::clone(&hw));
                added += 1;
                debug!(hardware = %hw.identifier(), "hardware added");
                self.publisher.emit(HardwareEvent::HardwareAdded(hw));
            }
        }
        for hw in rejected {
            hw.close();
        }
        added
    }

    /// Removes one hardware and raises HardwareRemoved. Closing it is up to the caller.
    pub fn remove(&self, identifier: &Identifier) -> Option<Arc<Hardware>> {
        let mut inner = self.inner.lock();
        let position = inner.hardware.iter().position(|h| h.identifier() == identifier)?;
        let hardware = inner.hardware.remove(position);
        if let Some(claims) = &inner.claims {
            claims.release(identifier);
        }
        debug!(hardware = %identifier, "hardware removed");
        self.publisher.emit(HardwareEvent::HardwareRemoved(Arc::clone(&hardware)));
        Some(hardware)
    }

    /// Replays HardwareAdded for the current content into `target`, then relays
    /// future HardwareAdded/HardwareRemoved there. Both happen under the set lock,
    /// so `target` sees every hardware exactly once.
    ///
    /// The current identifiers are taken in `claims`, and so is every hardware
    /// adopted until [`detach_relay`](Self::detach_relay). Fails with
    /// `DuplicateIdentifier` when one of them is already claimed, and with
    /// `InvalidArgument` when the set is attached elsewhere.
    pub fn attach_relay(&self, target: &Arc<Publisher>, claims: &Arc<IdentifierClaims>) -> Result<SubscriptionId> {
        let mut inner = self.inner.lock();
        if inner.claims.is_some() {
            return Err(Error::invalid_argument("hardware set is already attached"));
        }
        let identifiers: Vec<Identifier> = inner.hardware.iter().map(|h| h.identifier().clone()).collect();
        claims.claim_all(&identifiers)?;
        let id = match self.publisher.relay(target) {
            Ok(id) => id,
            Err(e) => {
                for identifier in &identifiers {
                    claims.release(identifier);
                }
                return Err(e);
            },
        };
        inner.claims = Some(Arc::clone(claims));
        for hardware in &inner.hardware {
            target.emit(HardwareEvent::HardwareAdded(Arc::clone(hardware)));
        }
        Ok(id)
    }

    /// Stops relaying and returns the content at that instant, atomically.
    /// Releases the claimed identifiers as well.
    pub fn detach_relay(&self, id: SubscriptionId) -> Vec<Arc<Hardware>> {
        let mut inner = self.inner.lock();
        self.publisher.unsubscribe(id);
        inner.release_all();
        inner.hardware.clone()
    }

    /// Marks the set closed, raises HardwareRemoved for every entry and closes them.
    /// Later calls do nothing.
    pub fn close_all(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.release_all();
            let drained = std::mem::take(&mut inner.hardware);
            for hardware in &drained {
                self.publisher.emit(HardwareEvent::HardwareRemoved(Arc::clone(hardware)));
            }
            drained
        };
        for hardware in drained {
            hardware.close();
        }
    }
}

impl fmt::Debug for HardwareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("HardwareSet")
            .field("hardware", &inner.hardware.iter().map(|h| h.identifier().to_string()).collect::<Vec<_>>())
            .field("attached", &inner.claims.is_some())
            .field("closed", &inner.closed)
            .finish()
    }
}
