//! Serial port transport.
//!
//! [`SerialTransport`] implements [`Transport`] for USB CDC virtual COM
//! ports and plain UARTs. Microcontroller boards running a USB CDC stack
//! typically appear as `/dev/ttyACM0` on Linux or `COM8` on Windows; the
//! baud rate is ignored by pure USB CDC devices but honoured by UART
//! bridges.
//!
//! Two details matter for USB CDC firmware:
//!
//! - Many CDC-ACM device stacks only treat the host as connected while DTR
//!   is asserted, so DTR is driven high on open unless
//!   [`SerialConfig::dtr_on_open`] says otherwise.
//! - The device may drop the first bytes written immediately after the port
//!   opens. [`SerialConfig::settle_delay`] waits before the transport is
//!   handed back to the caller.
//!
//! # Example
//!
//! ```no_run
//! use picolink_transport::SerialTransport;
//! use picolink_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> picolink_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0", 115_200).await?;
//! transport.send(&[0xA5, 0x02, 0x01, 0x02, 0x50, 0x51]).await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use picolink_core::error::{Error, Result};
use picolink_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

/// Default wait after opening before the port is used.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Serial port configuration.
///
/// Defaults: 115200 baud, 8N1, no flow control, DTR asserted, two second
/// settle delay.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    /// Level to drive DTR to right after opening.
    pub dtr_on_open: bool,
    /// How long to wait after opening before returning the transport.
    /// `Duration::ZERO` skips the wait.
    pub settle_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            dtr_on_open: true,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial link to a device.
pub struct SerialTransport {
    port: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open `port` at `baud_rate` with otherwise default settings.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open `port` with full configuration control.
    ///
    /// Returns only after [`SerialConfig::settle_delay`] has elapsed.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            flow_control = ?config.flow_control,
            dtr = config.dtr_on_open,
            "Opening serial port"
        );

        let mut stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("failed to open serial port {port}: {e}"))
            })?;

        if let Err(e) = stream.write_data_terminal_ready(config.dtr_on_open) {
            tracing::warn!(port = %port, error = %e, "Failed to set DTR");
        }

        if !config.settle_delay.is_zero() {
            tracing::debug!(
                port = %port,
                settle_ms = config.settle_delay.as_millis(),
                "Waiting for device to settle"
            );
            tokio::time::sleep(config.settle_delay).await;
        }

        tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened");

        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Broken pipes and vanished devices mean the USB cable or the board went away.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(port = %self.port_name, bytes = data.len(), data = ?data, "Writing");

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Write failed");
            map_io_error(e)
        })?;
        port.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Flush failed");
            map_io_error(e)
        })?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(port = %self.port_name, bytes = n, data = ?&buf[..n], "Read");
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Read failed");
                Err(map_io_error(e))
            }
            Err(_) => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "Read timed out"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(port = %self.port_name, error = %e, "Flush before close failed");
            }
            tracing::info!(port = %self.port_name, "Serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_usb_cdc_device() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::None);
        assert!(config.dtr_on_open);
        assert_eq!(config.settle_delay, Duration::from_secs(2));
    }

    #[test]
    fn enum_conversions() {
        assert_eq!(
            tokio_serial::DataBits::from(DataBits::Seven),
            tokio_serial::DataBits::Seven
        );
        assert_eq!(
            tokio_serial::StopBits::from(StopBits::Two),
            tokio_serial::StopBits::Two
        );
        assert_eq!(
            tokio_serial::Parity::from(Parity::Even),
            tokio_serial::Parity::Even
        );
        assert_eq!(
            tokio_serial::FlowControl::from(FlowControl::Hardware),
            tokio_serial::FlowControl::Hardware
        );
    }

    #[test]
    fn io_error_mapping() {
        let lost = map_io_error(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(lost, Error::ConnectionLost));
        let other = map_io_error(std::io::Error::from(std::io::ErrorKind::InvalidData));
        assert!(matches!(other, Error::Io(_)));
    }

    #[tokio::test]
    async fn open_missing_port_fails() {
        let config = SerialConfig {
            settle_delay: Duration::ZERO,
            ..Default::default()
        };
        let result = SerialTransport::open_with_config("/dev/picolink-does-not-exist", config).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
