//! Continuous readout example.
//!
//! Starts a weight stream at 500 ms intervals, prints readings until Ctrl-C,
//! then cancels the stream and prints the readings that were still in
//! flight.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p kcplib --example stream_weight -- 192.168.10.20:4001
//! ```

use std::time::Duration;

use kcplib::kern::KernBalanceBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.10.20:4001".to_string());

    let mut balance = KernBalanceBuilder::new().tcp_address(&addr).build().await?;
    let mut stream = balance.stream_weight(Duration::from_millis(500)).await?;

    let token = stream.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    while let Some(reading) = stream.next().await {
        match reading {
            Ok(weight) => println!("{}", weight),
            Err(e) => eprintln!("bad reading: {}", e),
        }
    }

    println!("Stream ended ({:?}).", stream.state());
    Ok(())
}
