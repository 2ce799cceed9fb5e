//! Transport implementations for picolink.
//!
//! Provides [`SerialTransport`], the concrete [`Transport`](picolink_core::Transport)
//! for USB CDC and UART links to a device.
//!
//! # Example
//!
//! ```no_run
//! use picolink_transport::{SerialConfig, SerialTransport};
//! use std::time::Duration;
//!
//! # async fn example() -> picolink_core::Result<()> {
//! let config = SerialConfig {
//!     settle_delay: Duration::from_millis(500),
//!     ..Default::default()
//! };
//! let transport = SerialTransport::open_with_config("/dev/ttyACM0", config).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{
    DEFAULT_SETTLE_DELAY, DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits,
};
