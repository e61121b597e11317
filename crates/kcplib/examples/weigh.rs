//! Basic balance example.
//!
//! Connects to a KERN balance, prints its identification, switches the
//! display to grams and takes one stable reading.
//!
//! # Requirements
//!
//! - A KERN balance with a KCP interface connected via RS-232 or USB
//! - The serial port path adjusted for your system (e.g., `/dev/ttyUSB0`
//!   on Linux, `COM3` on Windows)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p kcplib --example weigh
//! ```

use std::time::Duration;

use kcplib::InstrumentDriver;
use kcplib::kern::{IndicationUnit, KernBalanceBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Adjust this to match your system's serial port.
    let serial_port = "/dev/ttyUSB0";

    println!("Connecting to balance on {}...", serial_port);

    let mut balance = KernBalanceBuilder::new()
        .serial_port(serial_port)
        .baud_rate(9600)
        .response_timeout(Duration::from_secs(2))
        .build()
        .await?;

    let info = balance.query_device_information().await?;
    println!("Type: {} ({})", info.device_type, info.capacity);
    println!("Serial number: {}", balance.query_serial_number().await?);

    balance.set_indication_unit(&IndicationUnit::Grams).await?;

    println!("Waiting for a stable reading...");
    let weight = balance.weigh_stable().await?;
    println!("Weight: {}", weight);

    Ok(())
}
