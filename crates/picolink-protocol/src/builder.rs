//! SenderBuilder -- fluent builder for constructing [`CommandSender`] instances.
//!
//! Separates configuration from construction so callers can pick the STX
//! marker, CRC scope, timeouts, and serial parameters before the port is
//! opened.
//!
//! # Example
//!
//! ```no_run
//! use picolink_protocol::builder::SenderBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> picolink_core::Result<()> {
//! let mut sender = SenderBuilder::new()
//!     .serial_port("/dev/ttyACM0")
//!     .read_timeout(Duration::from_millis(500))
//!     .build()
//!     .await?;
//! let tx = sender.send(0x01, 0x02, 0x00).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use picolink_core::error::{Error, Result};
use picolink_core::transport::Transport;
use picolink_transport::{DEFAULT_SETTLE_DELAY, SerialConfig, SerialTransport};

use crate::frame::{CrcScope, DEFAULT_STX, FrameCodec};
use crate::sender::CommandSender;

/// Fluent builder for [`CommandSender`].
#[derive(Debug, Clone)]
pub struct SenderBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    stx: u8,
    crc_scope: CrcScope,
    read_timeout: Duration,
    settle_delay: Duration,
    dtr_on_open: bool,
}

impl Default for SenderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SenderBuilder {
    pub fn new() -> Self {
        SenderBuilder {
            serial_port: None,
            baud_rate: 115_200,
            stx: DEFAULT_STX,
            crc_scope: CrcScope::default(),
            read_timeout: Duration::from_secs(1),
            settle_delay: DEFAULT_SETTLE_DELAY,
            dtr_on_open: true,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyACM0` or `COM8`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Start-of-frame marker (default `0xA5`).
    pub fn stx(mut self, stx: u8) -> Self {
        self.stx = stx;
        self
    }

    pub fn crc_scope(mut self, scope: CrcScope) -> Self {
        self.crc_scope = scope;
        self
    }

    /// Timeout for a single [`read_any`](CommandSender::read_any) and the
    /// overall deadline of [`read_frame`](CommandSender::read_frame)
    /// (default: 1s).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Wait after opening the serial port (default: 2s).
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// DTR level applied after opening the serial port (default: asserted).
    pub fn dtr_on_open(mut self, on: bool) -> Self {
        self.dtr_on_open = on;
        self
    }

    fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.stx).with_crc_scope(self.crc_scope)
    }

    /// Build a [`CommandSender`] over a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `picolink-test-harness`) and for callers managing the link
    /// themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<CommandSender> {
        if self.read_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "read_timeout must be greater than zero".into(),
            ));
        }
        Ok(CommandSender::new(transport, self.codec(), self.read_timeout))
    }

    /// Open the configured serial port and build a [`CommandSender`] on it.
    ///
    /// Requires [`serial_port()`](Self::serial_port).
    pub async fn build(self) -> Result<CommandSender> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        if self.read_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "read_timeout must be greater than zero".into(),
            ));
        }

        let config = SerialConfig {
            baud_rate: self.baud_rate,
            dtr_on_open: self.dtr_on_open,
            settle_delay: self.settle_delay,
            ..Default::default()
        };
        let transport = SerialTransport::open_with_config(port, config).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picolink_test_harness::MockTransport;

    #[tokio::test]
    async fn builder_defaults() {
        let sender = SenderBuilder::new()
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(sender.stx(), 0xA5);
        assert_eq!(sender.codec().crc_scope(), CrcScope::ExcludeStx);
        assert_eq!(sender.read_timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn builder_fluent_chain() {
        let sender = SenderBuilder::new()
            .serial_port("/dev/ttyACM0")
            .baud_rate(9600)
            .stx(0x7E)
            .crc_scope(CrcScope::IncludeStx)
            .read_timeout(Duration::from_millis(200))
            .settle_delay(Duration::ZERO)
            .dtr_on_open(false)
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(sender.stx(), 0x7E);
        assert_eq!(sender.codec().crc_scope(), CrcScope::IncludeStx);
        assert_eq!(sender.read_timeout(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn builder_sender_uses_configured_stx() {
        let codec = FrameCodec::new(0x7E);
        let expected = codec.build(1, 2, 0).unwrap();
        let mut mock = MockTransport::new();
        mock.expect(&expected, &[]);

        let mut sender = SenderBuilder::new()
            .stx(0x7E)
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();
        assert_eq!(sender.send(1, 2, 0).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = SenderBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn builder_rejects_zero_timeout() {
        let result = SenderBuilder::new()
            .read_timeout(Duration::ZERO)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
