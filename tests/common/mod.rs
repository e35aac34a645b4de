#![allow(dead_code)]

pub mod builders;
pub mod mocks;

use std::time::Duration;

pub use builders::computer::{dimm_temperatures, two_modules, TestComputerBuilder};
use hwsense::HardwareEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// Every event currently queued, formatted as `Kind(/identifier)`
pub fn drain(rx: &mut UnboundedReceiver<HardwareEvent>) -> Vec<String> {
    std::iter::from_fn(|| rx.try_recv().ok()).map(|e| format!("{:?}", e)).collect()
}

/// Gives background tasks a chance to catch up
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
