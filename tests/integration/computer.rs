use std::sync::Arc;
use std::time::Duration;

use hwsense::group::{DetectionState, Group};
use hwsense::hardware::controller::msi::MsiFanControl;
use hwsense::traits::ScanResult;
use hwsense::{Error, Result};

use crate::common::mocks::{FakeCoolerBus, FakeSmbus};
use crate::common::{dimm_temperatures, drain, two_modules, TestComputerBuilder};

fn identifiers(computer: &hwsense::Computer) -> Vec<String> {
    computer.hardware().iter().map(|h| h.identifier().to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_modules_found_on_third_attempt_are_announced_once() -> Result<()> {
    let driver = Arc::new(
        FakeSmbus::new()
            .then_scan(ScanResult::Devices(Vec::new()))
            .then_scan(ScanResult::Devices(Vec::new()))
            .then_scan(ScanResult::Devices(two_modules()))
            .with_readings(0, dimm_temperatures(&[38.5]))
            .with_readings(2, dimm_temperatures(&[39.0])),
    );
    let computer = TestComputerBuilder::new().smbus(driver.clone()).build()?;
    let (_id, mut events) = computer.subscribe();

    let memory = computer.groups()[0].clone();
    memory.detection().wait().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(driver.scans(), 3);
    assert_eq!(memory.detection().state(), DetectionState::Ready);
    assert_eq!(drain(&mut events), vec!["HardwareAdded(/memory/dimm/0)", "HardwareAdded(/memory/dimm/2)"]);

    let dimms: Vec<String> = identifiers(&computer).into_iter().filter(|id| id.starts_with("/memory/dimm/")).collect();
    assert_eq!(dimms, vec!["/memory/dimm/0", "/memory/dimm/2"]);

    computer.close().await;
    assert_eq!(
        drain(&mut events),
        vec![
            "HardwareRemoved(/vram)",
            "HardwareRemoved(/ram)",
            "HardwareRemoved(/memory/dimm/0)",
            "HardwareRemoved(/memory/dimm/2)",
        ]
    );
    assert_eq!(driver.closes(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_report_includes_detection_error() -> Result<()> {
    let driver = Arc::new(FakeSmbus::new().then_fail("SMBus timeout"));
    let computer = TestComputerBuilder::new().smbus(driver.clone()).build()?;
    computer.groups()[0].detection().wait().await;

    assert_eq!(driver.scans(), 5);
    let report = computer.report();
    assert!(report.contains("Error while detecting memory: Detection attempt 5 failed: Driver error: SMBus timeout"));
    assert!(report.contains("Detection exhausted after 5 attempts"));
    assert!(report.contains("Generic Memory (/ram):"));
    assert!(report.contains("Virtual Memory Available: 6"));

    computer.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_close_during_backoff_stops_detection() -> Result<()> {
    let driver = Arc::new(FakeSmbus::new().then_scan(ScanResult::Devices(Vec::new())));
    let computer = TestComputerBuilder::new().smbus(driver.clone()).build()?;
    let memory = computer.groups()[0].clone();

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(driver.scans(), 1);

    computer.close().await;
    computer.close().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(driver.scans(), 1);
    assert_eq!(driver.closes(), 1);
    assert_eq!(memory.detection().state(), DetectionState::Closed);
    assert!(computer.hardware().is_empty());
    Ok(())
}

#[test]
fn test_driver_needs_runtime() {
    let driver = Arc::new(FakeSmbus::new());
    let result = TestComputerBuilder::new().smbus(driver).build();
    assert!(matches!(result, Err(Error::NotAvailable(_))));
}

#[tokio::test]
async fn test_memory_and_controller_groups() -> Result<()> {
    let mut frame = MsiFanControl { temperature_inlet: 29, temperature_outlet: 33, ..Default::default() };
    frame.fans[0].speed = 2100;
    frame.fans[0].duty = 70;
    let bus = Arc::new(FakeCoolerBus::default().with_device(0x0DB0, 0x8DBF).with_frame(frame));
    let computer = TestComputerBuilder::new().cooler_bus(bus.clone()).build()?;

    assert_eq!(identifiers(&computer), vec!["/vram", "/ram", "/msi/d360/0"]);

    let cooler = computer.hardware()[2].clone();
    let fan = cooler.sensors().into_iter().find(|s| s.identifier().to_string() == "/msi/d360/0/fan/0").unwrap();
    assert_eq!(fan.value(), Some(2100.0));

    bus.set_frame(None);
    computer.refresh();
    assert_eq!(fan.value(), None);
    assert_eq!(fan.max(), Some(2100.0));
    assert_eq!(cooler.sensors().len(), 14);

    let snapshot = serde_json::to_value(computer.snapshot())?;
    assert_eq!(snapshot[2]["identifier"], "/msi/d360/0");
    assert_eq!(snapshot[2]["hardware_type"], "cooler");

    computer.close().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_refresh_and_close() -> Result<()> {
    let driver = Arc::new(
        FakeSmbus::new()
            .then_scan(ScanResult::Devices(two_modules()))
            .with_readings(0, dimm_temperatures(&[40.0, 41.0]))
            .with_readings(2, dimm_temperatures(&[42.0])),
    );
    let computer = Arc::new(TestComputerBuilder::new().smbus(driver.clone()).build()?);
    computer.groups()[0].detection().wait().await;

    let sensors: Vec<_> = computer.hardware().iter().flat_map(|h| h.sensors()).collect();
    assert_eq!(sensors.len(), 9);

    let pollers: Vec<_> = (0..3)
        .map(|_| {
            let computer = Arc::clone(&computer);
            std::thread::spawn(move || {
                for _ in 0..300 {
                    computer.refresh();
                }
            })
        })
        .collect();

    computer.close().await;
    for poller in pollers {
        poller.join().expect("poller panicked");
    }

    for sensor in &sensors {
        assert!(sensor.hardware().is_none(), "{} still owned", sensor.identifier());
    }
    assert_eq!(driver.closes(), 1);
    Ok(())
}

#[tokio::test]
async fn test_close_announces_hardware_found_by_running_attempt() -> Result<()> {
    let driver = Arc::new(
        FakeSmbus::new()
            .holding_scans()
            .then_scan(ScanResult::Devices(two_modules()))
            .with_readings(0, dimm_temperatures(&[40.0]))
            .with_readings(2, dimm_temperatures(&[41.0])),
    );
    let computer = Arc::new(TestComputerBuilder::new().smbus(driver.clone()).build()?);
    let (_id, mut events) = computer.subscribe();

    while driver.scans() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let closing = tokio::spawn({
        let computer = Arc::clone(&computer);
        async move { computer.close().await }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!closing.is_finished());
    driver.release_scans();
    closing.await.expect("close panicked");

    assert_eq!(
        drain(&mut events),
        vec![
            "HardwareAdded(/memory/dimm/0)",
            "HardwareAdded(/memory/dimm/2)",
            "HardwareRemoved(/vram)",
            "HardwareRemoved(/ram)",
            "HardwareRemoved(/memory/dimm/0)",
            "HardwareRemoved(/memory/dimm/2)",
        ]
    );
    assert_eq!(driver.closes(), 1);
    Ok(())
}

#[tokio::test]
async fn test_groups_never_share_identifiers() -> Result<()> {
    let computer = TestComputerBuilder::new().build()?;
    let settings = Arc::new(hwsense::settings::MemorySettings::new());
    let second = Arc::new(hwsense::hardware::memory::MemoryGroup::new(
        settings,
        Arc::new(crate::common::mocks::FixedMemoryStatus::default()),
        None,
        hwsense::group::RetryPolicy::default(),
    )?);

    assert!(matches!(computer.add_group(second.clone()), Err(Error::DuplicateIdentifier(_))));
    assert_eq!(identifiers(&computer), vec!["/vram", "/ram"]);

    second.close().await;
    computer.close().await;
    Ok(())
}

