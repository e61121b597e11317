//! Transport implementations for kcplib.
//!
//! Concrete [`Transport`](kcplib_core::Transport) implementations for the
//! links KCP instruments are reached over:
//!
//! - [`SerialTransport`]: RS-232 and USB virtual COM ports, the usual
//!   connection to a lab balance
//! - [`TcpTransport`]: Ethernet-to-serial device servers and instruments
//!   with a raw TCP interface
//!
//! # Example
//!
//! ```no_run
//! use kcplib_transport::SerialTransport;
//! use kcplib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> kcplib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//!
//! // Ask for the serial number
//! transport.send(b"I4\r\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;
pub mod tcp;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
pub use tcp::TcpTransport;
