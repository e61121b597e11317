//! KERN lab balance driver for kcplib.
//!
//! This crate implements the balance side of KCP (Kern Communication
//! Protocol) on top of the generic [`Device`](kcplib_core::Device) engine.
//! It provides:
//!
//! - **Command vocabulary** ([`commands`]) -- the balance opcodes (`U`,
//!   `SIR`, `SI`, `S`, `T`, `Z`) and the weight field parser.
//! - **Value types** ([`types`]) -- [`WeightValue`] and [`IndicationUnit`].
//! - **Balance driver** ([`balance`]) -- [`KernLabBalance`], an
//!   [`InstrumentDriver`](kcplib_core::InstrumentDriver) with weighing,
//!   taring, zeroing and unit selection.
//! - **Weight streaming** ([`stream`]) -- [`WeightStream`], the continuous
//!   readout started by `SIR` and ended by the cancel command.
//! - **Builder** ([`builder`]) -- [`KernBalanceBuilder`] for serial or TCP
//!   links.
//!
//! # Example
//!
//! ```
//! use kcplib_kern::commands::parse_weight;
//! use kcplib_text_io::protocol::{DecodeResult, decode_response};
//!
//! // A reading pushed by a balance in continuous mode.
//! if let DecodeResult::Response { frame, .. } = decode_response(b"S D 12.34 g\r\n") {
//!     assert_eq!(frame.status, None);
//!     let weight = parse_weight(&frame.arguments).unwrap();
//!     assert!(!weight.stable);
//!     assert_eq!(weight.weight_value, 12.34);
//! }
//! ```

pub mod balance;
pub mod builder;
pub mod commands;
pub mod stream;
pub mod types;

// Re-export the primary types for ergonomic `use kcplib_kern::*`.
pub use balance::{BalanceSettings, KernLabBalance};
pub use builder::KernBalanceBuilder;
pub use commands::BalanceCommand;
pub use stream::{StreamState, WeightStream};
pub use types::{IndicationUnit, WeightValue};
