//! kcplib-core: Core traits, frames, and the request engine for kcplib.
//!
//! This crate defines the instrument-agnostic pieces of the KCP (Kern
//! Communication Protocol) client stack. Instrument drivers and applications
//! depend on these types without pulling in a specific transport or driver.
//!
//! # Key types
//!
//! - [`Device`] -- the generic request/response engine that drives one
//!   exchange, including staged (`B`egun) acknowledgments
//! - [`InstrumentDriver`] -- the trait every instrument driver implements
//! - [`Connection`] -- frame-level `transceive` abstraction
//! - [`Transport`] -- byte-level communication channel
//! - [`RequestFrame`] / [`ResponseFrame`] / [`ResponseStatus`] -- frame records
//! - [`Error`] / [`Result`] -- error handling

pub mod command;
pub mod connection;
pub mod decode;
pub mod device;
pub mod driver;
pub mod error;
pub mod frame;
pub mod transport;

// Re-export key types at crate root for ergonomic `use kcplib_core::*`.
pub use command::{Command, DeviceCommand};
pub use connection::Connection;
pub use decode::{
    DecodedValue, FieldKind, decode_decimal_bytes, decode_fields, decode_signed_integer_bytes,
    decode_string_bytes,
};
pub use device::{DEFAULT_MAX_CONTINUATIONS, Device, DeviceSettings, Exchange};
pub use driver::{DeviceInformation, InstrumentDriver};
pub use error::{Error, Result};
pub use frame::{RequestFrame, ResponseFrame, ResponseStatus};
pub use transport::Transport;
