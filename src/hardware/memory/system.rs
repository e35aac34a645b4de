use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::types::SensorType;
use crate::error::{Error, Result};
use crate::traits::{MemoryStatus, MemoryUsage, RawReading};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Which figures a [`SystemMemoryProbe`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMemoryKind {
    /// Installed RAM
    Physical,
    /// RAM plus swap
    Virtual,
}

impl SystemMemoryKind {
    pub fn label(&self) -> &'static str {
        match self {
            SystemMemoryKind::Physical => "Memory",
            SystemMemoryKind::Virtual => "Virtual Memory",
        }
    }

    /// Hardware name and identifier segment
    pub fn hardware(&self) -> (&'static str, &'static str) {
        match self {
            SystemMemoryKind::Physical => ("Generic Memory", "ram"),
            SystemMemoryKind::Virtual => ("Virtual Memory", "vram"),
        }
    }

    /// The fixed channel layout: load in percent, used and available in GiB.
    pub fn channels(&self) -> [(SensorType, usize, String); 3] {
        let label = self.label();
        [
            (SensorType::Load, 0, label.to_string()),
            (SensorType::Data, 0, format!("{} Used", label)),
            (SensorType::Data, 1, format!("{} Available", label)),
        ]
    }
}

/// Reads memory totals through a [`MemoryStatus`]
pub struct SystemMemoryProbe {
    status: Arc<dyn MemoryStatus>,
    kind: SystemMemoryKind,
}

impl SystemMemoryProbe {
    pub fn new(status: Arc<dyn MemoryStatus>, kind: SystemMemoryKind) -> Self {
        Self { status, kind }
    }

    pub fn kind(&self) -> SystemMemoryKind {
        self.kind
    }

    pub(crate) fn sample(&mut self) -> Result<Vec<RawReading>> {
        let usage = match self.kind {
            SystemMemoryKind::Physical => self.status.physical()?,
            SystemMemoryKind::Virtual => self.status.virtual_memory()?,
        };
        let [load, used, available] = self.kind.channels();
        Ok(vec![
            RawReading::new(load.0, load.1, load.2, usage.load()),
            RawReading::new(used.0, used.1, used.2, Some(gib(usage.used()))),
            RawReading::new(available.0, available.1, available.2, Some(gib(usage.available))),
        ])
    }
}

impl fmt::Debug for SystemMemoryProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemMemoryProbe").field("kind", &self.kind).finish()
    }
}

fn gib(bytes: u64) -> f32 {
    (bytes as f64 / GIB) as f32
}

/// [`MemoryStatus`] backed by `/proc/meminfo`
#[derive(Debug, Clone)]
pub struct ProcMeminfo {
    path: PathBuf,
}

impl Default for ProcMeminfo {
    fn default() -> Self {
        Self { path: PathBuf::from("/proc/meminfo") }
    }
}

/// Values of `/proc/meminfo` in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Meminfo {
    mem_total: u64,
    mem_available: u64,
    swap_total: u64,
    swap_free: u64,
}

impl ProcMeminfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a meminfo-formatted file somewhere else
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<Meminfo> {
        let content = std::fs::read_to_string(&self.path)?;
        parse_meminfo(&content)
    }
}

fn parse_meminfo(content: &str) -> Result<Meminfo> {
    let mut info = Meminfo::default();
    let mut found_total = false;
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kib) = value.parse::<u64>() else {
            continue;
        };
        let bytes = kib * 1024;
        match key {
            "MemTotal:" => {
                info.mem_total = bytes;
                found_total = true;
            },
            "MemAvailable:" => info.mem_available = bytes,
            "SwapTotal:" => info.swap_total = bytes,
            "SwapFree:" => info.swap_free = bytes,
            _ => {},
        }
    }
    if !found_total {
        return Err(Error::not_available("MemTotal missing from meminfo"));
    }
    Ok(info)
}

impl MemoryStatus for ProcMeminfo {
    fn physical(&self) -> Result<MemoryUsage> {
        let info = self.read()?;
        Ok(MemoryUsage { total: info.mem_total, available: info.mem_available })
    }

    fn virtual_memory(&self) -> Result<MemoryUsage> {
        let info = self.read()?;
        Ok(MemoryUsage {
            total: info.mem_total + info.swap_total,
            available: info.mem_available + info.swap_free,
        })
    }
}
