//! Scan for nearby BLE devices and connect to the strongest one.
//!
//! Run with: cargo run --example scan_and_connect

use showcase_core::{
    BtleRadio, ConnectionController, DeviceListScreen, PermissionGate, Radio, Result,
    ScanController, DEFAULT_SCAN_TIMEOUT,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("showcase_core=debug".parse().unwrap()),
        )
        .init();

    println!("Scanning for BLE devices...\n");

    let radio: Arc<dyn Radio> = Arc::new(BtleRadio::new().await?);
    let scanner = Arc::new(ScanController::new(radio.clone()));
    let connection = Arc::new(ConnectionController::new(radio, scanner.clone()));

    let screen = DeviceListScreen::new(PermissionGate::desktop(), scanner.clone(), connection);

    // Print devices as they appear.
    let _handle = scanner.on_device_discovered(|device| {
        println!(
            "  found {} ({}, {:?} dBm)",
            device.display_name(),
            device.id,
            device.rssi
        );
    });

    screen.activate().await?;

    // The scan auto-stops after the configured timeout.
    tokio::time::sleep(DEFAULT_SCAN_TIMEOUT).await;

    let devices = screen.devices();
    if devices.is_empty() {
        println!("\nNo named devices found.");
        return Ok(());
    }

    println!("\n{}", screen.title());
    for (i, device) in devices.iter().enumerate() {
        println!(
            "  {}. {} ({:?} dBm)",
            i + 1,
            device.display_name(),
            device.rssi
        );
    }

    // Connect to the strongest device.
    let strongest = &devices[0];
    println!("\nConnecting to {}...", strongest.display_name());

    match screen.select(&strongest.id).await {
        Ok(conn) => {
            println!("{}", screen.title());
            println!("Services:");
            for service in &conn.services {
                println!(
                    "  {} ({} characteristics)",
                    service.uuid,
                    service.characteristics.len()
                );
            }
        }
        Err(e) => println!("{e}"),
    }

    screen.deactivate().await;
    Ok(())
}
