//! Framed command protocol for microcontroller peripherals.
//!
//! A host addresses a device and sends it a command over a byte stream using
//! short length-prefixed frames with a CRC-16/Modbus trailer. This crate
//! provides:
//!
//! - **Value coercion** ([`value`]) -- turn integers, hex/decimal text, and
//!   raw bytes into address, command, and payload fields.
//! - **Checksum** ([`crc`]) -- CRC-16/Modbus.
//! - **Frame codec** ([`frame`]) -- build outbound frames and validate
//!   received ones.
//! - **CommandSender** ([`sender`]) -- writes frames to a
//!   [`Transport`](picolink_core::Transport) and reads replies.
//! - **SenderBuilder** ([`builder`]) -- fluent configuration for
//!   `CommandSender`.
//!
//! # Example
//!
//! ```
//! use picolink_protocol::frame::FrameCodec;
//!
//! let codec = FrameCodec::default();
//! let bytes = codec.build("0x01", "0x10", 25).unwrap();
//! assert_eq!(bytes, vec![0xA5, 0x04, 0x01, 0x10, 0x00, 0x19, 0x14, 0x33]);
//!
//! let frame = codec.parse(&bytes).unwrap();
//! assert_eq!(frame.payload, vec![0x00, 0x19]);
//! ```

pub mod builder;
pub mod crc;
pub mod frame;
pub mod sender;
pub mod value;

pub use builder::SenderBuilder;
pub use frame::{CrcScope, Frame, FrameCodec};
pub use sender::CommandSender;
pub use value::Value;
