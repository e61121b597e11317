//! # kcplib -- KCP client for KERN instruments
//!
//! `kcplib` is an asynchronous Rust library for talking to laboratory
//! instruments (balances first) over KCP, the Kern Communication Protocol:
//! a line-oriented request/response protocol in which every request is
//! answered by zero or more `B` (begun) frames and one terminal `A`, `L` or
//! `I` frame.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kcplib::InstrumentDriver;
//! use kcplib::kern::{IndicationUnit, KernBalanceBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut balance = KernBalanceBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     println!("serial number: {}", balance.query_serial_number().await?);
//!     balance.set_indication_unit(&IndicationUnit::Grams).await?;
//!     println!("{}", balance.weigh_stable().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate               | Purpose                                              |
//! |---------------------|------------------------------------------------------|
//! | `kcplib-core`       | Frames, [`Connection`], [`Device`] engine, [`InstrumentDriver`], errors |
//! | `kcplib-text-io`    | CR LF line codec and [`TransportConnection`](text_io::TransportConnection) |
//! | `kcplib-transport`  | Serial and TCP transports                            |
//! | `kcplib-kern`       | KERN lab balance driver and weight streaming         |
//! | **`kcplib`**        | This facade crate -- re-exports everything           |
//!
//! ## Feature Flags
//!
//! | Feature | Enables                                | Default |
//! |---------|----------------------------------------|---------|
//! | `kern`  | [`kern`] module (lab balance driver)   | yes     |

pub use kcplib_core::*;

/// Frame codec and the transport-backed [`Connection`].
pub mod text_io {
    pub use kcplib_text_io::*;
}

/// Serial and TCP transports.
pub mod transports {
    pub use kcplib_transport::*;
}

/// KERN lab balance backend.
///
/// Provides [`KernLabBalance`](kern::KernLabBalance),
/// [`KernBalanceBuilder`](kern::KernBalanceBuilder) and the
/// [`WeightStream`](kern::WeightStream) continuous readout.
#[cfg(feature = "kern")]
pub mod kern {
    pub use kcplib_kern::*;
}
