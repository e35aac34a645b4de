use std::sync::atomic::AtomicU32;

use super::*;
use crate::core::events::HardwareEvent;
use crate::core::types::SensorType;
use crate::error::Error;
use crate::group::DetectionState;
use crate::settings::MemorySettings;
use crate::traits::{DeviceDescriptor, MemoryUsage, MockMemoryStatus, MockSmbusDriver, RawReading};

const GIB: u64 = 1024 * 1024 * 1024;

fn settings() -> Arc<dyn Settings> {
    Arc::new(MemorySettings::new())
}

fn status() -> Arc<dyn MemoryStatus> {
    let mut status = MockMemoryStatus::new();
    status.expect_physical().returning(|| Ok(MemoryUsage { total: 16 * GIB, available: 4 * GIB }));
    status.expect_virtual_memory().returning(|| Ok(MemoryUsage { total: 20 * GIB, available: 6 * GIB }));
    Arc::new(status)
}

fn modules() -> Vec<DeviceDescriptor> {
    vec![
        DeviceDescriptor::new(0, 0x50).with_part("Kingston", "KF3200C16D4/16GX"),
        DeviceDescriptor::new(1, 0x51),
    ]
}

fn temperature(device: &DeviceDescriptor) -> Result<Vec<RawReading>> {
    Ok(vec![RawReading::new(SensorType::Temperature, 0, "DIMM", Some(40.0 + device.index as f32))])
}

#[test]
fn test_static_hardware_without_driver() {
    let group = MemoryGroup::new(settings(), status(), None, RetryPolicy::default()).unwrap();
    let hardware = group.hardware();
    let ids: Vec<String> = hardware.iter().map(|h| h.identifier().to_string()).collect();
    assert_eq!(ids, vec!["/vram", "/ram"]);
    assert_eq!(group.detection().state(), DetectionState::Idle);

    let ram = &hardware[1];
    assert_eq!(ram.name(), "Generic Memory");
    let sensors = ram.sensors();
    assert_eq!(sensors.len(), 3);
    assert_eq!(sensors[0].value(), Some(75.0));
    assert_eq!(sensors[1].name(), "Memory Used");
    assert_eq!(sensors[1].value(), Some(12.0));
    assert_eq!(sensors[2].value(), Some(4.0));
}

#[test]
fn test_driver_outside_runtime_is_not_available() {
    let driver: Arc<dyn SmbusDriver> = Arc::new(MockSmbusDriver::new());
    let result = MemoryGroup::new(settings(), status(), Some(driver), RetryPolicy::default());
    assert!(matches!(result, Err(Error::NotAvailable(_))));
}

#[tokio::test(start_paused = true)]
async fn test_modules_found_on_third_attempt() {
    let scans = Arc::new(AtomicU32::new(0));
    let mut driver = MockSmbusDriver::new();
    driver.expect_open().times(1).returning(|| Ok(()));
    let counter = Arc::clone(&scans);
    driver.expect_scan().returning(move || {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Ok(ScanResult::Devices(Vec::new()))
        } else {
            Ok(ScanResult::Devices(modules()))
        }
    });
    driver.expect_read().returning(temperature);
    driver.expect_close().times(1).returning(|| Ok(()));

    let group = MemoryGroup::new(settings(), status(), Some(Arc::new(driver)), RetryPolicy::default()).unwrap();
    let (_id, mut rx) = group.hardware_set().publisher().subscribe();
    group.detection().wait().await;

    assert_eq!(scans.load(Ordering::SeqCst), 3);
    assert_eq!(group.detection().state(), DetectionState::Ready);

    let added: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|e| match e {
            HardwareEvent::HardwareAdded(h) => Some(h.name()),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["Kingston - KF3200C16D4/16GX (#0)", "DIMM #1"]);

    let hardware = group.hardware();
    assert_eq!(hardware.len(), 4);
    let dimm = &hardware[3];
    assert_eq!(dimm.identifier().to_string(), "/memory/dimm/1");
    assert_eq!(dimm.properties().get("smbus_address").map(String::as_str), Some("0x51"));
    // Populated before it was announced
    assert_eq!(dimm.sensors()[0].value(), Some(41.0));

    group.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_bus_is_exhausted_and_reported() {
    let mut driver = MockSmbusDriver::new();
    driver.expect_open().times(1).returning(|| Ok(()));
    driver.expect_scan().times(5).returning(|| Err(Error::driver("SMBus controller busy")));
    driver.expect_close().times(1).returning(|| Ok(()));

    let group = MemoryGroup::new(settings(), status(), Some(Arc::new(driver)), RetryPolicy::default()).unwrap();
    group.detection().wait().await;

    assert_eq!(group.detection().state(), DetectionState::Exhausted);
    assert_eq!(group.hardware().len(), 2);

    let report = group.report();
    assert!(report.starts_with("Memory Report:\n"));
    assert!(report.contains("Error while detecting memory: Detection attempt 5 failed: Driver error: SMBus controller busy"));
    assert!(report.contains("Generic Memory (/ram):"));
    assert!(report.contains("Memory Used: 12"));

    group.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_driver_never_opened_is_never_closed() {
    let mut driver = MockSmbusDriver::new();
    driver.expect_open().returning(|| Err(Error::driver("access denied")));
    driver.expect_close().times(0);

    let group = MemoryGroup::new(settings(), status(), Some(Arc::new(driver)), RetryPolicy::default()).unwrap();
    group.detection().wait().await;
    group.close().await;
    assert_eq!(group.detection().state(), DetectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_close_mid_backoff_closes_driver_once() {
    let mut driver = MockSmbusDriver::new();
    driver.expect_open().times(1).returning(|| Ok(()));
    driver.expect_scan().times(1).returning(|| Ok(ScanResult::Devices(Vec::new())));
    driver.expect_close().times(1).returning(|| Err(Error::driver("handle already gone")));

    let group = MemoryGroup::new(settings(), status(), Some(Arc::new(driver)), RetryPolicy::default()).unwrap();
    let ram = group.hardware()[1].clone();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    group.close().await;
    group.close().await;

    assert!(group.hardware().is_empty());
    assert!(ram.is_closed());
    assert!(ram.sensors().is_empty());
    // The close failure is recorded instead of returned
    assert!(matches!(group.detection().last_error().as_deref(), Some(Error::Driver(_))));
}

#[tokio::test(start_paused = true)]
async fn test_close_while_refreshing_leaves_no_owned_sensors() {
    let mut driver = MockSmbusDriver::new();
    driver.expect_open().returning(|| Ok(()));
    driver.expect_scan().returning(|| Ok(ScanResult::Devices(modules())));
    driver.expect_read().returning(temperature);
    driver.expect_close().returning(|| Ok(()));

    let group = MemoryGroup::new(settings(), status(), Some(Arc::new(driver)), RetryPolicy::default()).unwrap();
    group.detection().wait().await;
    let hardware = group.hardware();
    let sensors: Vec<_> = hardware.iter().flat_map(|h| h.sensors()).collect();

    let pollers: Vec<_> = hardware
        .iter()
        .cloned()
        .map(|hw| {
            std::thread::spawn(move || {
                for _ in 0..200 {
                    hw.refresh();
                }
            })
        })
        .collect();

    group.close().await;
    for poller in pollers {
        poller.join().unwrap();
    }

    for sensor in &sensors {
        assert!(!sensor.is_attached(), "{} still owned after close", sensor.identifier());
    }
    assert!(hardware.iter().all(|h| h.sensors().is_empty()));
}
