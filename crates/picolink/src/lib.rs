//! # picolink -- framed commands for microcontroller peripherals
//!
//! `picolink` is the host side of a small binary protocol for addressing
//! and commanding a device over a byte stream (USB CDC or UART). Each
//! command is one frame:
//!
//! ```text
//! STX(0xA5) LEN ADDR CMD [PAYLOAD...] CRC_LO CRC_HI
//! ```
//!
//! with `LEN = 2 + payload length` and a CRC-16/Modbus trailer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use picolink::SenderBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut sender = SenderBuilder::new()
//!         .serial_port("/dev/ttyACM0")
//!         .build()
//!         .await?;
//!
//!     let tx = sender.send(0x01, 0x02, 0x00).await?;
//!     println!("TX: {}", picolink::hex_string(&tx));
//!     let reply = sender.read_frame().await?;
//!     println!("reply from {:#04X}: {:02X?}", reply.addr, reply.payload);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                    | Purpose                                         |
//! |--------------------------|-------------------------------------------------|
//! | `picolink-core`          | [`Error`], [`Transport`] trait, hex helpers     |
//! | `picolink-protocol`      | Value coercion, CRC, frame codec, sender        |
//! | `picolink-transport`     | Serial transport (tokio-serial)                 |
//! | `picolink-test-harness`  | Scripted mock transport                         |
//! | **`picolink`**           | This facade crate -- re-exports everything      |
//!
//! ## Frames without I/O
//!
//! The codec is pure and usable on its own:
//!
//! ```
//! use picolink::FrameCodec;
//!
//! let codec = FrameCodec::default();
//! let bytes = codec.build(0x01, 0x02, 0x00).unwrap();
//! assert_eq!(picolink::hex_string(&bytes), "A5 04 01 02 00 00 75 FC");
//! assert_eq!(codec.parse(&bytes).unwrap().cmd, 0x02);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Enables                                   | Default |
//! |----------|-------------------------------------------|---------|
//! | `serial` | [`transport`] module (`SerialTransport`)  | yes     |

pub use picolink_core::*;
pub use picolink_protocol::{
    CommandSender, CrcScope, Frame, FrameCodec, SenderBuilder, Value, builder, crc, frame, sender,
    value,
};

/// Serial transport for USB CDC and UART links.
#[cfg(feature = "serial")]
pub mod transport {
    pub use picolink_transport::*;
}
