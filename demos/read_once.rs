//! One-shot Wave Plus reader
//!
//! Run with: cargo run --example read_once

use airthings_wave_ble::{BleClient, MeasurementSinks, Result, WavePlus};
use std::time::Duration;

/// Cadence for connection attempts while a reading is still pending.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    println!("Wave Plus Reader");
    println!("================\n");
    println!("Scanning for a Wave Plus...\n");

    let (client, mut events) = BleClient::new().await?;
    client.discover(Duration::from_secs(30)).await?;

    println!("Found one. Reading sensors...\n");

    let sinks = MeasurementSinks::new()
        .on_humidity(|rh| println!("  Humidity:        {rh:.1} %RH"))
        .on_radon(|bq| println!("  Radon (24h):     {bq:.0} Bq/m³"))
        .on_radon_long_term(|bq| println!("  Radon (long):    {bq:.0} Bq/m³"))
        .on_temperature(|c| println!("  Temperature:     {c:.2} °C"))
        .on_pressure(|hpa| println!("  Pressure:        {hpa:.2} hPa"))
        .on_co2(|ppm| println!("  CO2:             {ppm:.0} ppm"))
        .on_tvoc(|ppb| println!("  TVOC:            {ppb:.0} ppb"));

    let mut driver = WavePlus::new(client, sinks);
    driver.dump_config();

    let mut poll = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                break;
            }
            _ = poll.tick() => {
                if driver.last_read_at().is_some() {
                    // One successful reading is all this demo wants.
                    break;
                }
                driver.poll();
            }
            Some(event) = events.recv() => {
                driver.handle_event(event);
            }
        }
    }

    Ok(())
}
