use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use hwsense::traits::{DeviceDescriptor, RawReading, ScanResult, SmbusDriver};
use hwsense::{Error, Result};
use parking_lot::{Condvar, Mutex};

/// Scripted SMBus driver. Scan results are consumed in order; the last one repeats.
#[derive(Debug, Default)]
pub struct FakeSmbus {
    scans: Mutex<VecDeque<std::result::Result<ScanResult, String>>>,
    readings: Mutex<HashMap<u8, Vec<RawReading>>>,
    fail_open: bool,
    // While set, `scan` parks until `release_scans`
    held: Mutex<bool>,
    released: Condvar,
    pub opens: AtomicUsize,
    pub scan_calls: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeSmbus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_scan(self, result: ScanResult) -> Self {
        self.scans.lock().push_back(Ok(result));
        self
    }

    pub fn then_fail(self, reason: &str) -> Self {
        self.scans.lock().push_back(Err(reason.to_string()));
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Makes every scan block until [`release_scans`](Self::release_scans)
    pub fn holding_scans(self) -> Self {
        *self.held.lock() = true;
        self
    }

    pub fn release_scans(&self) {
        *self.held.lock() = false;
        self.released.notify_all();
    }

    pub fn with_readings(self, index: u8, readings: Vec<RawReading>) -> Self {
        self.readings.lock().insert(index, readings);
        self
    }

    /// Replaces what a module reports from now on
    pub fn set_readings(&self, index: u8, readings: Vec<RawReading>) {
        self.readings.lock().insert(index, readings);
    }

    pub fn scans(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl SmbusDriver for FakeSmbus {
    fn open(&self) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(Error::driver("driver not loaded"));
        }
        Ok(())
    }

    fn scan(&self) -> Result<ScanResult> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut held = self.held.lock();
            while *held {
                self.released.wait(&mut held);
            }
        }
        let mut scans = self.scans.lock();
        let next = if scans.len() > 1 { scans.pop_front() } else { scans.front().cloned() };
        match next {
            Some(Ok(result)) => Ok(result),
            Some(Err(reason)) => Err(Error::driver(reason)),
            None => Ok(ScanResult::NoDevices),
        }
    }

    fn read(&self, device: &DeviceDescriptor) -> Result<Vec<RawReading>> {
        self.readings
            .lock()
            .get(&device.index)
            .cloned()
            .ok_or_else(|| Error::driver(format!("no SPD data for slot {}", device.index)))
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
