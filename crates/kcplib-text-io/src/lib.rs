//! Text-line codec and frame-level connection for KCP instruments.
//!
//! KCP instruments exchange CR LF terminated ASCII lines. This crate turns
//! those lines into [`ResponseFrame`](kcplib_core::ResponseFrame)s and back,
//! and provides [`TransportConnection`], the
//! [`Connection`](kcplib_core::Connection) every real instrument link uses.
//!
//! # Architecture
//!
//! - [`protocol`] -- encode requests, decode response lines
//! - [`connection`] -- [`TransportConnection`] over a boxed
//!   [`Transport`](kcplib_core::Transport)

pub mod connection;
pub mod protocol;

pub use connection::{ConnectionConfig, MAX_BUF, TransportConnection};
