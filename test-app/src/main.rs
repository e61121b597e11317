// kcplib test application -- CLI tool for exercising a KERN balance over
// KCP against real hardware or a scripted mock transport.
//
// Usage:
//   kcplib-test-app --port /dev/ttyUSB0 info
//   kcplib-test-app --port COM3 --baud 19200 weigh --stable
//   kcplib-test-app --tcp 192.168.10.20:4001 unit kg
//   kcplib-test-app --tcp 192.168.10.20:4001 stream --interval-ms 500 --count 20
//   kcplib-test-app --mock stream --count 5
//   kcplib-test-app -vv --mock commands

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kcplib::kern::{IndicationUnit, KernBalanceBuilder, KernLabBalance};
use kcplib::text_io::TransportConnection;
use kcplib::text_io::protocol::{encode_request, encode_response};
use kcplib::{Error, InstrumentDriver, RequestFrame, ResponseFrame, ResponseStatus};
use kcplib_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// kcplib test application -- exercises a KERN balance from the command line.
#[derive(Parser)]
#[command(name = "kcplib-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    #[arg(long)]
    port: Option<String>,

    /// TCP address of a device server (e.g. 192.168.10.20:4001).
    #[arg(long)]
    tcp: Option<String>,

    /// Override the default baud rate (9600). Serial only.
    #[arg(long)]
    baud: Option<u32>,

    /// Per-read response timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Talk to a simulated balance instead of real hardware.
    /// Useful for verifying CLI parsing and the protocol stack end to end.
    #[arg(long)]
    mock: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print device type, capacity, versions and serial number.
    Info,

    /// Set the display unit (g, kg, mg, ct, lb, oz, ozt, dwt, GN, ...).
    Unit {
        /// Unit token as understood by the balance.
        unit: String,
    },

    /// Read the current weight.
    Weigh {
        /// Wait for a stable reading instead of reporting immediately.
        #[arg(long)]
        stable: bool,
    },

    /// Tare the balance.
    Tare,

    /// Zero the balance.
    Zero,

    /// Continuously print weight readings.
    Stream {
        /// Interval between readings in milliseconds.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many readings (0 = until Ctrl-C).
        #[arg(long, default_value_t = 10)]
        count: u32,
    },

    /// List the KCP commands the balance implements.
    Commands,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn validate_options(cli: &Cli) -> Result<()> {
    let links = [cli.port.is_some(), cli.tcp.is_some(), cli.mock]
        .iter()
        .filter(|set| **set)
        .count();
    if links == 0 {
        bail!("one of --port, --tcp or --mock is required");
    }
    if links > 1 {
        bail!("--port, --tcp and --mock are mutually exclusive");
    }
    if cli.baud.is_some() && cli.port.is_none() {
        bail!("--baud is only valid with --port");
    }
    if cli.timeout_ms == 0 {
        bail!("--timeout-ms must be greater than zero");
    }
    if let Command::Stream { interval_ms, count } = &cli.command {
        if *interval_ms == 0 {
            bail!("--interval-ms must be greater than zero");
        }
        if cli.mock && *count == 0 {
            bail!("--mock needs a finite --count for stream");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Balance construction
// ---------------------------------------------------------------------------

async fn create_balance(cli: &Cli) -> Result<KernLabBalance<TransportConnection>> {
    let mut builder =
        KernBalanceBuilder::new().response_timeout(Duration::from_millis(cli.timeout_ms));

    if cli.mock {
        let mock = simulated_balance(&cli.command).context("failed to script mock balance")?;
        return builder
            .build_with_transport(Box::new(mock))
            .await
            .context("failed to build balance over mock transport");
    }

    if let Some(port) = cli.port.as_deref() {
        builder = builder.serial_port(port);
        if let Some(baud) = cli.baud {
            builder = builder.baud_rate(baud);
        }
    }
    if let Some(addr) = cli.tcp.as_deref() {
        builder = builder.tcp_address(addr);
    }

    builder.build().await.context("failed to connect to balance")
}

/// Script a mock transport with what a PCB-type balance would answer for
/// `command`, so every exchange runs through the real codec.
fn simulated_balance(command: &Command) -> Result<MockTransport> {
    let mut mock = MockTransport::new();
    let reading = |marker: &str, value: &str| {
        ResponseFrame::untagged("S", &[marker.as_bytes(), value.as_bytes(), b"g"])
    };

    match command {
        Command::Info => {
            script(
                &mut mock,
                "I2",
                &[],
                &[ResponseFrame::accepted("I2", &[b"PCB", b"250.000 g"])],
            )?;
            script(
                &mut mock,
                "I1",
                &[],
                &[ResponseFrame::accepted("I1", &[b"01", b"2.00"])],
            )?;
            script(
                &mut mock,
                "I3",
                &[],
                &[ResponseFrame::accepted("I3", &[b"1.07"])],
            )?;
            script(
                &mut mock,
                "I4",
                &[],
                &[
                    ResponseFrame::begun("I4", &[]),
                    ResponseFrame::accepted("I4", &[b"WB1234567"]),
                ],
            )?;
            script(
                &mut mock,
                "IBIM",
                &[],
                &[ResponseFrame::accepted("IBIM", &[b"PCB 250-3"])],
            )?;
        }
        Command::Unit { unit } => {
            let reply = match unit.parse::<IndicationUnit>() {
                Ok(IndicationUnit::Other(_)) | Err(_) => ResponseFrame::tagged(
                    "U",
                    ResponseStatus::LogicalError,
                    &[b"invalid unit"],
                ),
                Ok(_) => ResponseFrame::accepted("U", &[]),
            };
            script(&mut mock, "U", &[unit.as_str()], &[reply])?;
        }
        Command::Weigh { stable: true } => {
            script(
                &mut mock,
                "S",
                &[],
                &[
                    ResponseFrame::begun("S", &[]),
                    ResponseFrame::begun("S", &[]),
                    ResponseFrame::accepted("S", &[b"S", b"100.00", b"g"]),
                ],
            )?;
        }
        Command::Weigh { stable: false } => {
            script(
                &mut mock,
                "SI",
                &[],
                &[ResponseFrame::accepted("SI", &[b"D", b"99.98", b"g"])],
            )?;
        }
        Command::Tare => {
            script(
                &mut mock,
                "T",
                &[],
                &[ResponseFrame::accepted("T", &[b"S", b"12.30", b"g"])],
            )?;
        }
        Command::Zero => {
            script(&mut mock, "Z", &[], &[ResponseFrame::accepted("Z", &[])])?;
        }
        Command::Stream { interval_ms, count } => {
            let mut replies = vec![ResponseFrame::accepted("SIR", &[])];
            for i in 0..*count {
                let marker = if i % 3 == 2 { "S" } else { "D" };
                let value = format!("{:.2}", 100.0 + f64::from(i) * 0.01);
                replies.push(reading(marker, &value));
            }
            let interval = interval_ms.to_string();
            script(&mut mock, "SIR", &[interval.as_str()], &replies)?;
            // One reading is already on the wire when the cancel arrives.
            script(
                &mut mock,
                "@",
                &[],
                &[reading("S", "100.50"), ResponseFrame::accepted("@", &[])],
            )?;
        }
        Command::Commands => {
            let mut replies = Vec::new();
            for (i, token) in ["I0", "I1", "I2", "I3", "I4", "I5", "S", "SI", "SIR", "T", "Z", "U", "@"]
                .iter()
                .enumerate()
            {
                let index = i.to_string();
                replies.push(ResponseFrame::begun("I0", &[index.as_bytes(), token.as_bytes()]));
            }
            replies.push(ResponseFrame::accepted("I0", &[]));
            script(&mut mock, "I0", &[], &replies)?;
        }
    }

    Ok(mock)
}

fn script(
    mock: &mut MockTransport,
    command: &str,
    arguments: &[&str],
    replies: &[ResponseFrame],
) -> Result<()> {
    let request = encode_request(&RequestFrame::new(None, command, arguments))?;
    let mut response = Vec::new();
    for frame in replies {
        response.extend(encode_response(frame)?);
    }
    mock.expect(&request, &response);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_info(balance: &mut KernLabBalance<TransportConnection>) -> Result<()> {
    let info = balance.query_device_information().await?;
    let versions = balance.query_kcp_versions().await?;
    let software = balance.query_software_version().await?;
    let serial = balance.query_serial_number().await?;

    println!("Balance Information");
    println!("  Driver:         {}", balance.name());
    println!("  Type:           {}", info.device_type);
    println!("  Capacity:       {}", info.capacity);
    println!("  KCP versions:   {}", versions.join(", "));
    println!("  Software:       {}", software);
    println!("  Serial number:  {}", serial);

    // IBIM is optional; older firmware rejects it.
    match balance.query_model_number().await {
        Ok(model) => println!("  Model number:   {}", model),
        Err(Error::Protocol { status, .. }) => println!("  Model number:   n/a ({status})"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn cmd_unit(balance: &mut KernLabBalance<TransportConnection>, unit: &str) -> Result<()> {
    let unit: IndicationUnit = unit.parse()?;
    match balance.set_indication_unit(&unit).await {
        Ok(()) => {
            println!("Indication unit set to {}", unit);
            Ok(())
        }
        Err(e @ Error::Protocol { .. }) => {
            let detail = e.diagnostic_text().join(" ");
            bail!("balance rejected unit {}: {} {}", unit, e, detail)
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_weigh(balance: &mut KernLabBalance<TransportConnection>, stable: bool) -> Result<()> {
    let start = Instant::now();
    let weight = if stable {
        balance.weigh_stable().await?
    } else {
        balance.weigh_immediately().await?
    };
    println!("{}  [{:.0} ms]", weight, start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

async fn cmd_tare(balance: &mut KernLabBalance<TransportConnection>) -> Result<()> {
    let tare = balance.tare().await?;
    println!("Tared: {}", tare);
    Ok(())
}

async fn cmd_zero(balance: &mut KernLabBalance<TransportConnection>) -> Result<()> {
    balance.zero().await?;
    println!("Zeroed.");
    Ok(())
}

async fn cmd_stream(
    balance: &mut KernLabBalance<TransportConnection>,
    interval_ms: u64,
    count: u32,
) -> Result<()> {
    let mut stream = balance
        .stream_weight(Duration::from_millis(interval_ms))
        .await
        .context("failed to start weight stream")?;

    let token = stream.cancel_token();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });

    let start = Instant::now();
    let mut received = 0u32;
    let mut bad = 0u32;
    let mut fatal = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(weight) => {
                received += 1;
                println!("[{:>8.3} s] {}", start.elapsed().as_secs_f64(), weight);
            }
            Err(e @ Error::Decode(_)) => {
                bad += 1;
                eprintln!("bad reading: {e}");
            }
            Err(e) => fatal = Some(e),
        }
        if count > 0 && received >= count && !token.is_cancelled() {
            token.cancel();
        }
    }

    println!();
    println!("Results:");
    println!("  Readings:       {received}");
    println!("  Bad readings:   {bad}");
    println!("  Elapsed:        {:.3} s", start.elapsed().as_secs_f64());

    if let Some(e) = fatal {
        return Err(e).context("weight stream failed");
    }
    Ok(())
}

async fn cmd_commands(balance: &mut KernLabBalance<TransportConnection>) -> Result<()> {
    let commands = balance.list_commands().await?;
    println!("{} implemented commands:", commands.len());
    for command in commands {
        println!("  {command}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Validate option combinations early.
    validate_options(&cli)?;

    let mut balance = create_balance(&cli).await?;

    let result = match &cli.command {
        Command::Info => cmd_info(&mut balance).await,
        Command::Unit { unit } => cmd_unit(&mut balance, unit).await,
        Command::Weigh { stable } => cmd_weigh(&mut balance, *stable).await,
        Command::Tare => cmd_tare(&mut balance).await,
        Command::Zero => cmd_zero(&mut balance).await,
        Command::Stream { interval_ms, count } => {
            cmd_stream(&mut balance, *interval_ms, *count).await
        }
        Command::Commands => cmd_commands(&mut balance).await,
    };

    let mut connection = balance.into_device().into_connection();
    if let Err(e) = connection.close().await {
        tracing::warn!(error = %e, "closing connection failed");
    }

    result
}
