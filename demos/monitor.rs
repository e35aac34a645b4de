use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use hwsense::core::types::SensorType;
use hwsense::settings::JsonFileSettings;
use hwsense::{Capabilities, Computer, ComputerConfig};
use tracing_subscriber::EnvFilter;

/// Helper function to format a sensor value with its unit
fn format_value(sensor_type: SensorType, value: Option<f32>) -> String {
    let Some(value) = value else {
        return "-".to_string();
    };
    match sensor_type {
        SensorType::Temperature => format!("{:.1}°C", value),
        SensorType::Load | SensorType::Control | SensorType::Level => format!("{:.1}%", value),
        SensorType::Data => format!("{:.2} GB", value),
        SensorType::Fan => format!("{:.0} RPM", value),
        _ => format!("{:.2}", value),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?)).init();

    println!("hwsense - Hardware Monitor Example");
    println!("Press Ctrl+C to exit\n");

    let config = ComputerConfig::load("hwsense.json")?;
    let settings = Arc::new(JsonFileSettings::load("hwsense-settings.json")?);
    let computer = Computer::open(config, Capabilities::new(settings.clone()))?;
    let (_id, mut events) = computer.subscribe();

    for _ in 0..5 {
        while let Ok(event) = events.try_recv() {
            println!("event: {:?}", event);
        }

        computer.refresh();
        for hardware in computer.hardware() {
            println!("═══════════ {} ({}) ═══════════", hardware.name(), hardware.identifier());
            for sensor in hardware.sensors().iter().filter(|s| s.is_visible()) {
                println!(
                    "  {:<28} {:>12}  (min {}, max {})",
                    sensor.name(),
                    format_value(sensor.sensor_type(), sensor.value()),
                    format_value(sensor.sensor_type(), sensor.min()),
                    format_value(sensor.sensor_type(), sensor.max()),
                );
            }
        }
        println!();

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {},
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("{}", computer.report());
    computer.close().await;
    settings.save()?;
    Ok(())
}
