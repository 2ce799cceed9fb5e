//! Scripted transport for testing the framing and sender layers.
//!
//! [`MockTransport`] implements [`Transport`] on top of an in-memory
//! receive queue. Tests script it two ways:
//!
//! - [`expect`](MockTransport::expect): the next `send()` must carry exactly
//!   these bytes, after which the paired response becomes readable.
//! - [`push_incoming`](MockTransport::push_incoming): bytes the device
//!   sends on its own, readable without any prior `send()`.
//!
//! USB CDC links deliver data in packets of arbitrary size, so
//! [`with_chunk_size`](MockTransport::with_chunk_size) can cap how many
//! bytes each `receive()` returns.
//!
//! # Example
//!
//! ```
//! use picolink_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new().with_chunk_size(64);
//! mock.expect(&[0xA5, 0x04, 0x01, 0x02, 0x00, 0x00, 0x75, 0xFC],
//!             &[0xA5, 0x04, 0x01, 0x02, 0x00, 0x00, 0x75, 0xFC]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use picolink_core::error::{Error, Result};
use picolink_core::transport::Transport;

#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// A [`Transport`] that replays scripted traffic instead of touching hardware.
///
/// A `send()` with no expectation left, or with bytes that differ from the
/// next expectation, fails with [`Error::Protocol`]. A `receive()` with
/// nothing queued fails with [`Error::Timeout`] immediately.
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be returned by `receive()`.
    incoming: VecDeque<u8>,
    /// Upper bound on bytes returned per `receive()`.
    chunk_size: usize,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a connected mock with an empty script.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            incoming: VecDeque::new(),
            chunk_size: usize::MAX,
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Return at most `size` bytes per `receive()` (minimum 1).
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Require the next `send()` to be `request`, then queue `response`.
    ///
    /// An empty `response` models a device that accepts the command
    /// silently.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Queue bytes as if the device had sent them unprompted.
    pub fn push_incoming(&mut self, data: &[u8]) {
        self.incoming.extend(data);
    }

    /// Every buffer passed to `send()`, in order.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Number of queued bytes not yet read.
    pub fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }

    /// Force the connected state. While disconnected, `send()` and
    /// `receive()` fail with [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent_log.push(data.to_vec());

        let expectation = self.expectations.pop_front().ok_or_else(|| {
            Error::Protocol(format!("unscripted send of {data:02X?}"))
        })?;
        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )));
        }
        self.incoming.extend(expectation.response);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.incoming.is_empty() {
            return Err(Error::Timeout);
        }

        let n = buf.len().min(self.chunk_size).min(self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.incoming.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn scripted_exchange() {
        let mut mock = MockTransport::new();
        let request = [0xA5, 0x02, 0x01, 0x02, 0x50, 0x51];
        let response = [0xA5, 0x03, 0x01, 0x02, 0x00, 0x11, 0x22];
        mock.expect(&request, &response);

        mock.send(&request).await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, WAIT).await.unwrap();
        assert_eq!(&buf[..n], &response);
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn records_sent_data() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[]);
        mock.expect(&[0x02, 0x03], &[]);

        mock.send(&[0x01]).await.unwrap();
        mock.send(&[0x02, 0x03]).await.unwrap();

        assert_eq!(mock.sent_data(), &[vec![0x01u8], vec![0x02u8, 0x03]]);
    }

    #[tokio::test]
    async fn mismatched_send_is_protocol_error() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xFF]);

        let result = mock.send(&[0x99]).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
        assert_eq!(mock.pending_incoming(), 0);
    }

    #[tokio::test]
    async fn unscripted_send_is_protocol_error() {
        let mut mock = MockTransport::new();
        assert!(matches!(mock.send(&[0x01]).await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn empty_queue_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 8];
        assert!(matches!(
            mock.receive(&mut buf, WAIT).await,
            Err(Error::Timeout)
        ));
    }

    #[tokio::test]
    async fn unsolicited_bytes_without_send() {
        let mut mock = MockTransport::new();
        mock.push_incoming(&[0xA5, 0x02]);

        let mut buf = [0u8; 8];
        let n = mock.receive(&mut buf, WAIT).await.unwrap();
        assert_eq!(&buf[..n], &[0xA5, 0x02]);
    }

    #[tokio::test]
    async fn chunked_delivery() {
        let mut mock = MockTransport::new().with_chunk_size(2);
        mock.push_incoming(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 16];
        let mut seen = Vec::new();
        while let Ok(n) = mock.receive(&mut buf, WAIT).await {
            assert!(n <= 2);
            seen.extend_from_slice(&buf[..n]);
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn small_caller_buffer() {
        let mut mock = MockTransport::new();
        mock.push_incoming(&[0xAA, 0xBB, 0xCC]);

        let mut buf = [0u8; 2];
        assert_eq!(mock.receive(&mut buf, WAIT).await.unwrap(), 2);
        assert_eq!(buf, [0xAA, 0xBB]);
        assert_eq!(mock.pending_incoming(), 1);
    }

    #[tokio::test]
    async fn close_disconnects_and_drops_queue() {
        let mut mock = MockTransport::new();
        mock.push_incoming(&[0x01]);
        mock.close().await.unwrap();

        assert!(!mock.is_connected());
        assert_eq!(mock.pending_incoming(), 0);
        assert!(matches!(mock.send(&[0x01]).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn set_connected_false() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);

        let mut buf = [0u8; 8];
        assert!(matches!(
            mock.receive(&mut buf, WAIT).await,
            Err(Error::NotConnected)
        ));
    }
}
