use std::sync::Arc;

use hwsense::core::types::SensorType;
use hwsense::hardware::memory::MemoryGroup;
use hwsense::prelude::*;
use hwsense::settings::MemorySettings;
use hwsense::traits::{ScanResult, SmbusDriver};

use crate::common::mocks::{FakeSmbus, FixedMemoryStatus};
use crate::common::{dimm_temperatures, drain, two_modules};

async fn detected(driver: Arc<FakeSmbus>) -> MemoryGroup {
    let group = MemoryGroup::new(
        Arc::new(MemorySettings::new()),
        Arc::new(FixedMemoryStatus::default()),
        Some(driver as Arc<dyn SmbusDriver>),
        RetryPolicy::default(),
    )
    .unwrap();
    group.detection().wait().await;
    group
}

#[tokio::test]
async fn test_vanishing_dimm_channel() {
    let driver = Arc::new(
        FakeSmbus::new()
            .then_scan(ScanResult::Devices(two_modules()))
            .with_readings(0, dimm_temperatures(&[40.0, 41.0]))
            .with_readings(2, dimm_temperatures(&[42.0])),
    );
    let group = detected(driver.clone()).await;
    let dimm = group.hardware().into_iter().find(|h| h.identifier().to_string() == "/memory/dimm/0").unwrap();
    assert_eq!(dimm.sensors().len(), 2);

    let (_id, mut events) = dimm.publisher().subscribe();
    driver.set_readings(0, dimm_temperatures(&[40.5]));
    dimm.refresh();

    assert_eq!(
        drain(&mut events),
        vec!["SensorRemoved(/memory/dimm/0/temperature/1)", "ValuesUpdated(/memory/dimm/0)"]
    );
    let sensors = dimm.sensors();
    assert_eq!(sensors.len(), 1);
    assert_eq!(sensors[0].sensor_type(), SensorType::Temperature);
    assert_eq!(sensors[0].value(), Some(40.5));
    assert_eq!(sensors[0].min(), Some(40.0));

    group.close().await;
}

#[tokio::test]
async fn test_no_devices_signal_ends_detection() {
    let driver = Arc::new(FakeSmbus::new().then_scan(ScanResult::NoDevices));
    let group = detected(driver.clone()).await;
    assert_eq!(driver.scans(), 1);
    assert_eq!(group.detection().state(), DetectionState::Ready);
    assert_eq!(group.hardware().len(), 2);
    group.close().await;
    assert_eq!(driver.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_is_retried() {
    let driver = Arc::new(FakeSmbus::new().failing_open());
    let group = detected(driver.clone()).await;
    assert_eq!(driver.opens.load(std::sync::atomic::Ordering::SeqCst), 5);
    assert_eq!(driver.scans(), 0);
    assert_eq!(group.detection().state(), DetectionState::Exhausted);

    group.close().await;
    assert_eq!(driver.closes(), 0);
}
