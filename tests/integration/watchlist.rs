use std::sync::Arc;

use hwsense::settings::MemorySettings;
use hwsense::traits::{ScanResult, Settings};
use hwsense::watchlist::SensorWatchlist;
use hwsense::{Identifier, Result};

use crate::common::mocks::FakeSmbus;
use crate::common::{dimm_temperatures, settle, two_modules, TestComputerBuilder};

fn id(path: &str) -> Identifier {
    path.parse().unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_follows_flagged_sensors_through_the_tree() -> Result<()> {
    let settings = Arc::new(MemorySettings::new());
    settings.set("/memory/dimm/2/temperature/0:tray", "true");
    let driver = Arc::new(
        FakeSmbus::new()
            .then_scan(ScanResult::Devices(two_modules()))
            .with_readings(0, dimm_temperatures(&[40.0]))
            .with_readings(2, dimm_temperatures(&[42.0])),
    );
    let computer = TestComputerBuilder::new().settings(settings.clone()).smbus(driver.clone()).build()?;

    let watchlist = SensorWatchlist::new(settings.clone());
    let task = watchlist.spawn(&computer)?;
    computer.groups()[0].detection().wait().await;
    settle().await;

    let flagged = id("/memory/dimm/2/temperature/0");
    assert!(watchlist.contains(&flagged));
    assert_eq!(watchlist.len(), 1);

    // The channel disappears: dropped from the list, flag kept
    driver.set_readings(2, Vec::new());
    computer.refresh();
    settle().await;
    assert!(watchlist.is_empty());
    assert!(settings.contains("/memory/dimm/2/temperature/0:tray"));

    // And comes back
    driver.set_readings(2, dimm_temperatures(&[43.0]));
    computer.refresh();
    settle().await;
    assert!(watchlist.contains(&flagged));

    computer.close().await;
    settle().await;
    assert!(watchlist.is_empty());

    task.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_existing_hardware_is_picked_up() -> Result<()> {
    let settings = Arc::new(MemorySettings::new());
    settings.set("/ram/load/0:tray", "true");
    let computer = TestComputerBuilder::new().settings(settings.clone()).build()?;

    let watchlist = SensorWatchlist::new(settings.clone());
    let task = watchlist.spawn(&computer)?;
    assert!(watchlist.contains(&id("/ram/load/0")));

    let used = computer.hardware()[1].sensors()[1].clone();
    assert!(watchlist.add(&used, false));
    settings.set("/ram/data/0:traycolor", "#00ff00");
    assert!(watchlist.remove(&used));
    assert!(!settings.contains("/ram/data/0:tray"));
    assert!(!settings.contains("/ram/data/0:traycolor"));

    task.stop().await;
    computer.close().await;
    Ok(())
}
