//! Hierarchical keys naming hardware and sensors.
//!
//! An [`Identifier`] is an ordered list of segments rendered as `/seg0/seg1/...`.
//! The rendering doubles as the namespace for persisted settings, so two
//! different segment lists never render to the same string: segments may not
//! contain the path separator `/` or the settings-purpose separator `:`.
//!
//! ```rust
//! use hwsense::core::Identifier;
//!
//! let dimm = Identifier::new(None, ["memory", "dimm", "0"]).unwrap();
//! let temp = dimm.child("temperature").unwrap();
//! assert_eq!(temp.to_string(), "/memory/dimm/0/temperature");
//! assert_eq!(temp.setting_key("hidden"), "/memory/dimm/0/temperature:hidden");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator placed before every segment
pub const SEPARATOR: char = '/';

/// Separator between an identifier and a settings purpose suffix
pub const PURPOSE_SEPARATOR: char = ':';

/// Stable hierarchical key. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    segments: Vec<String>,
}

impl Identifier {
    /// Builds an identifier from an optional parent followed by `segments`.
    ///
    /// Fails with [`Error::InvalidArgument`] when a segment contains a reserved separator.
    pub fn new<I, S>(parent: Option<&Identifier>, segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = parent.map(|p| p.segments.clone()).unwrap_or_default();
        for segment in segments {
            let segment = segment.into();
            validate_segment(&segment)?;
            all.push(segment);
        }
        Ok(Self { segments: all })
    }

    /// Shorthand for a root-level identifier.
    pub fn root<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(None, segments)
    }

    /// Returns a new identifier with one more segment.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self> {
        Self::new(Some(self), [segment])
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The identifier with its last segment dropped, `None` at the root.
    pub fn parent(&self) -> Option<Identifier> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self { segments: self.segments[..self.segments.len() - 1].to_vec() })
    }

    /// True when `self` lies strictly below `other`.
    pub fn is_descendant_of(&self, other: &Identifier) -> bool {
        self.segments.len() > other.segments.len() && self.segments.starts_with(&other.segments)
    }

    /// Settings key for one purpose, e.g. `"/ram/load/0:hidden"`.
    pub fn setting_key(&self, purpose: &str) -> String {
        format!("{}{}{}", self, PURPOSE_SEPARATOR, purpose)
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.contains(SEPARATOR) || segment.contains(PURPOSE_SEPARATOR) {
        return Err(Error::invalid_argument(format!(
            "identifier segment {:?} contains a reserved separator",
            segment
        )));
    }
    Ok(())
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{}{}", SEPARATOR, segment)?;
        }
        Ok(())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self { segments: Vec::new() });
        }
        let rest = s
            .strip_prefix(SEPARATOR)
            .ok_or_else(|| Error::invalid_argument(format!("identifier {:?} must start with '/'", s)))?;
        Self::root(rest.split(SEPARATOR))
    }
}

impl TryFrom<String> for Identifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}
