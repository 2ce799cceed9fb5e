//! Transport trait for device communication.
//!
//! The [`Transport`] trait abstracts over the byte stream to the
//! microcontroller. The framing code never touches a serial port directly:
//! the command sender in `picolink-protocol` drives a `Transport`, which is
//! either a real USB CDC / UART link (`picolink-transport`) or a scripted
//! `MockTransport` from `picolink-test-harness`.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a device.
///
/// Implementations own all blocking behaviour (timeouts, settle delays,
/// flushing). Framing, checksums, and addressing are handled by the
/// protocol layer that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write raw bytes to the device.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read bytes from the device into `buf`.
    ///
    /// Returns the number of bytes read, which may be fewer than
    /// `buf.len()`. Waits up to `timeout` for data; returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing arrives
    /// within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the connection.
    ///
    /// After `close()`, `send()` and `receive()` return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
