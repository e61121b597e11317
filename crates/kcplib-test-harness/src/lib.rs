//! kcplib-test-harness: Mock transports and scripted connections for kcplib.
//!
//! This crate provides [`MockTransport`] for deterministic byte-level
//! testing of the frame codec, and [`MockConnection`] for driving instrument
//! drivers with scripted response frames, both without a real instrument.

pub mod mock_connection;
pub mod mock_serial;

pub use mock_connection::{MockConnection, Reply};
pub use mock_serial::MockTransport;
