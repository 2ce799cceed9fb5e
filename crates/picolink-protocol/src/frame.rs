//! Command frame encoder/decoder.
//!
//! Frames are length-prefixed and protected by a CRC-16/Modbus trailer.
//! This module only deals with complete, already-buffered frames; pulling
//! bytes off a link until a frame is whole is the sender's job.
//!
//! # Frame format
//!
//! ```text
//! STX LEN ADDR CMD [PAYLOAD...] CRC_LO CRC_HI
//! ```
//!
//! - `STX`: start marker, fixed per codec (default `0xA5`)
//! - `LEN`: byte count from `ADDR` through the end of `PAYLOAD` (2..=255)
//! - `ADDR`: target device address
//! - `CMD`: command opcode
//! - `PAYLOAD`: 0..=253 opaque bytes
//! - `CRC_LO CRC_HI`: CRC-16/Modbus, low byte first, over `LEN..PAYLOAD`
//!   (or `STX..PAYLOAD` with [`CrcScope::IncludeStx`])

use bytes::{BufMut, BytesMut};
use picolink_core::{Error, Result};

use crate::crc::checksum;
use crate::value::{Value, to_payload, to_u8};

/// Default start-of-frame marker.
pub const DEFAULT_STX: u8 = 0xA5;

/// Smallest legal `LEN` (ADDR + CMD, no payload).
pub const MIN_LEN: usize = 2;

/// Largest legal `LEN`; the field is a single byte.
pub const MAX_LEN: usize = 255;

/// Largest payload that fits in a frame.
pub const MAX_PAYLOAD: usize = MAX_LEN - MIN_LEN;

/// Bytes outside the `LEN` count: STX, LEN, CRC_LO, CRC_HI.
const OVERHEAD: usize = 4;

/// Size of a frame with an empty payload.
pub const MIN_FRAME: usize = MIN_LEN + OVERHEAD;

/// Size of a frame carrying [`MAX_PAYLOAD`] bytes.
pub const MAX_FRAME: usize = MAX_LEN + OVERHEAD;

/// Which bytes the trailing CRC covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcScope {
    /// `LEN` through the end of the payload.
    #[default]
    ExcludeStx,
    /// `STX` through the end of the payload, as the device firmware and
    /// older host scripts compute it.
    IncludeStx,
}

/// A decoded command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Device address.
    pub addr: u8,
    /// Command opcode.
    pub cmd: u8,
    /// Payload bytes (may be empty).
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(addr: u8, cmd: u8, payload: impl Into<Vec<u8>>) -> Self {
        Frame {
            addr,
            cmd,
            payload: payload.into(),
        }
    }

    /// Number of bytes this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        OVERHEAD + MIN_LEN + self.payload.len()
    }

    /// Status byte of a device reply: the first payload byte, by the
    /// firmware's status-first reply convention. `None` for an empty payload.
    pub fn status(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

/// Builds and validates frames for one sender.
///
/// The STX marker and CRC scope are fixed at construction. The codec holds
/// no other state, so a single instance can be shared freely across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    stx: u8,
    crc_scope: CrcScope,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_STX)
    }
}

impl FrameCodec {
    /// Create a codec using `stx` as the start marker.
    pub const fn new(stx: u8) -> Self {
        FrameCodec {
            stx,
            crc_scope: CrcScope::ExcludeStx,
        }
    }

    /// Return a copy of this codec using a different CRC scope.
    pub const fn with_crc_scope(mut self, crc_scope: CrcScope) -> Self {
        self.crc_scope = crc_scope;
        self
    }

    pub fn stx(&self) -> u8 {
        self.stx
    }

    pub fn crc_scope(&self) -> CrcScope {
        self.crc_scope
    }

    /// Build a complete frame from loosely-typed inputs.
    ///
    /// `addr` and `cmd` go through [`to_u8`], `data` through
    /// [`to_payload`], so a scalar payload becomes two big-endian bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use picolink_protocol::frame::FrameCodec;
    ///
    /// let codec = FrameCodec::default();
    /// let bytes = codec.build(0x01, 0x02, 0x00).unwrap();
    /// assert_eq!(bytes, vec![0xA5, 0x04, 0x01, 0x02, 0x00, 0x00, 0x75, 0xFC]);
    /// ```
    pub fn build(
        &self,
        addr: impl Into<Value>,
        cmd: impl Into<Value>,
        data: impl Into<Value>,
    ) -> Result<Vec<u8>> {
        let addr = to_u8(&addr.into())?;
        let cmd = to_u8(&cmd.into())?;
        let payload = to_payload(&data.into())?;
        self.encode_fields(addr, cmd, &payload)
    }

    /// Encode an already-typed [`Frame`].
    ///
    /// The payload is taken as-is (no scalar promotion).
    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        self.encode_fields(frame.addr, frame.cmd, &frame.payload)
    }

    fn encode_fields(&self, addr: u8, cmd: u8, payload: &[u8]) -> Result<Vec<u8>> {
        let len = MIN_LEN + payload.len();
        if len > MAX_LEN {
            return Err(Error::OutOfRange(format!(
                "frame too large: LEN would be {len}, limit is {MAX_LEN}"
            )));
        }

        let mut buf = BytesMut::with_capacity(len + OVERHEAD);
        buf.put_u8(self.stx);
        buf.put_u8(len as u8);
        buf.put_u8(addr);
        buf.put_u8(cmd);
        buf.put_slice(payload);
        let crc = checksum(self.crc_input(&buf));
        buf.put_u16_le(crc);
        Ok(buf.to_vec())
    }

    /// Validate a received frame and extract its fields.
    ///
    /// `buf` must start with the STX marker. Bytes after the end declared
    /// by `LEN` are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use picolink_protocol::frame::FrameCodec;
    ///
    /// let codec = FrameCodec::default();
    /// let frame = codec
    ///     .parse(&[0xA5, 0x04, 0x01, 0x02, 0x00, 0x00, 0x75, 0xFC])
    ///     .unwrap();
    /// assert_eq!((frame.addr, frame.cmd), (0x01, 0x02));
    /// assert_eq!(frame.payload, vec![0x00, 0x00]);
    /// ```
    pub fn parse(&self, buf: &[u8]) -> Result<Frame> {
        if buf.len() < MIN_FRAME {
            return Err(Error::Format(format!(
                "too short: {} bytes, a frame needs at least {MIN_FRAME}",
                buf.len()
            )));
        }
        if buf[0] != self.stx {
            return Err(Error::Format(format!(
                "bad STX: expected 0x{:02X}, got 0x{:02X}",
                self.stx, buf[0]
            )));
        }

        let len = usize::from(buf[1]);
        if len < MIN_LEN {
            return Err(Error::Format(format!(
                "bad LEN: {len}, must be at least {MIN_LEN}"
            )));
        }
        let total = len + OVERHEAD;
        if buf.len() < total {
            return Err(Error::Format(format!(
                "truncated: LEN {len} needs {total} bytes, have {}",
                buf.len()
            )));
        }

        let body_end = 2 + len;
        let expected = checksum(self.crc_input(&buf[..body_end]));
        let actual = u16::from_le_bytes([buf[body_end], buf[body_end + 1]]);
        if expected != actual {
            return Err(Error::Checksum { expected, actual });
        }

        Ok(Frame {
            addr: buf[2],
            cmd: buf[3],
            payload: buf[4..body_end].to_vec(),
        })
    }

    /// Total size of the frame at the start of `buf`, once its `LEN` byte
    /// has arrived. `None` while fewer than two bytes are buffered.
    pub fn frame_len(&self, buf: &[u8]) -> Option<usize> {
        buf.get(1).map(|&len| usize::from(len) + OVERHEAD)
    }

    /// The slice of `STX..PAYLOAD` the CRC is computed over.
    fn crc_input<'a>(&self, head: &'a [u8]) -> &'a [u8] {
        match self.crc_scope {
            CrcScope::ExcludeStx => &head[1..],
            CrcScope::IncludeStx => head,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn format_message(result: Result<Frame>) -> String {
        match result {
            Err(Error::Format(msg)) => msg,
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    // ---------------------------------------------------------------
    // Building
    // ---------------------------------------------------------------

    #[test]
    fn build_scalar_zero_payload() {
        let bytes = FrameCodec::default().build(0x01, 0x02, 0x00).unwrap();
        assert_eq!(bytes, vec![0xA5, 0x04, 0x01, 0x02, 0x00, 0x00, 0x75, 0xFC]);
        let crc = checksum(&[0x04, 0x01, 0x02, 0x00, 0x00]);
        assert_eq!(&bytes[6..], &crc.to_le_bytes());
    }

    #[test]
    fn build_empty_payload() {
        let bytes = FrameCodec::default()
            .build(0x01, 0x02, Value::None)
            .unwrap();
        assert_eq!(bytes, vec![0xA5, 0x02, 0x01, 0x02, 0x50, 0x51]);
    }

    #[test]
    fn build_scalar_data_value() {
        // Text address/command as a script would pass them.
        let bytes = FrameCodec::default()
            .build(b"0x01", b"0x10", 25)
            .unwrap();
        assert_eq!(bytes, vec![0xA5, 0x04, 0x01, 0x10, 0x00, 0x19, 0x14, 0x33]);
    }

    #[test]
    fn build_with_custom_stx() {
        let codec = FrameCodec::new(0x7E);
        let bytes = codec.build(0x01, 0x02, 0x00).unwrap();
        assert_eq!(bytes[0], 0x7E);
        // STX is outside the default CRC scope, so the trailer is unchanged.
        assert_eq!(&bytes[1..], &[0x04, 0x01, 0x02, 0x00, 0x00, 0x75, 0xFC]);
    }

    #[test]
    fn build_crc_including_stx() {
        let codec = FrameCodec::default().with_crc_scope(CrcScope::IncludeStx);
        let bytes = codec.build(0x01, 0x02, 0x00).unwrap();
        assert_eq!(bytes, vec![0xA5, 0x04, 0x01, 0x02, 0x00, 0x00, 0x49, 0x12]);
    }

    #[test]
    fn build_max_payload() {
        let payload = vec![0x5A; MAX_PAYLOAD];
        let bytes = FrameCodec::default().build(1, 2, payload).unwrap();
        assert_eq!(bytes.len(), MAX_FRAME);
        assert_eq!(bytes[1], 0xFF);
    }

    #[test]
    fn build_frame_too_large() {
        let payload = vec![0x00; MAX_PAYLOAD + 1];
        match FrameCodec::default().build(1, 2, payload) {
            Err(Error::OutOfRange(msg)) => assert!(msg.starts_with("frame too large")),
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn build_propagates_coercion_errors() {
        let codec = FrameCodec::default();
        assert!(matches!(
            codec.build(256, 1, Value::None),
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(
            codec.build(1, "zz", Value::None),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            codec.build(Value::None, 1, Value::None),
            Err(Error::UnsupportedType(_))
        ));
        assert!(matches!(
            codec.build(1, 1, -3),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn encode_frame_struct() {
        let frame = Frame::new(0x01, 0x02, vec![0x00, 0x00]);
        let bytes = FrameCodec::default().encode(&frame).unwrap();
        assert_eq!(bytes.len(), frame.encoded_len());
        assert_eq!(bytes, FrameCodec::default().build(0x01, 0x02, 0x00).unwrap());
    }

    #[test]
    fn encode_does_not_promote_single_byte() {
        let frame = Frame::new(0x01, 0x02, vec![0x07]);
        let bytes = FrameCodec::default().encode(&frame).unwrap();
        assert_eq!(bytes[1], 0x03);
        assert_eq!(bytes[4], 0x07);
    }

    // ---------------------------------------------------------------
    // Parsing
    // ---------------------------------------------------------------

    #[test]
    fn parse_known_frame() {
        let frame = FrameCodec::default()
            .parse(&[0xA5, 0x04, 0x01, 0x10, 0x00, 0x19, 0x14, 0x33])
            .unwrap();
        assert_eq!(frame, Frame::new(0x01, 0x10, vec![0x00, 0x19]));
    }

    #[test]
    fn parse_empty_payload() {
        let frame = FrameCodec::default()
            .parse(&[0xA5, 0x02, 0x01, 0x02, 0x50, 0x51])
            .unwrap();
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn parse_too_short() {
        let msg = format_message(FrameCodec::default().parse(&[0xA5, 0x02, 0x01]));
        assert!(msg.starts_with("too short"));
        let msg = format_message(FrameCodec::default().parse(&[]));
        assert!(msg.starts_with("too short"));
    }

    #[test]
    fn parse_bad_stx() {
        let msg = format_message(
            FrameCodec::default().parse(&[0x5A, 0x02, 0x01, 0x02, 0x50, 0x51]),
        );
        assert!(msg.starts_with("bad STX"));
    }

    #[test]
    fn parse_bad_len() {
        let msg = format_message(
            FrameCodec::default().parse(&[0xA5, 0x01, 0x01, 0x02, 0x50, 0x51]),
        );
        assert!(msg.starts_with("bad LEN"));
    }

    #[test]
    fn parse_truncated() {
        let bytes = FrameCodec::default().build(1, 2, vec![9u8; 10]).unwrap();
        let msg = format_message(FrameCodec::default().parse(&bytes[..bytes.len() - 1]));
        assert!(msg.starts_with("truncated"));
    }

    #[test]
    fn parse_ignores_trailing_bytes() {
        let mut bytes = FrameCodec::default().build(1, 2, 3).unwrap();
        bytes.extend_from_slice(&[0xA5, 0x02]);
        let frame = FrameCodec::default().parse(&bytes).unwrap();
        assert_eq!(frame, Frame::new(1, 2, vec![0x00, 0x03]));
    }

    #[test]
    fn parse_checksum_mismatch_reports_both_values() {
        let bytes = [0xA5, 0x04, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00];
        match FrameCodec::default().parse(&bytes) {
            Err(Error::Checksum { expected, actual }) => {
                assert_eq!(expected, 0xFC75);
                assert_eq!(actual, 0x0000);
            }
            other => panic!("expected Checksum, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_other_crc_scope() {
        let firmware = FrameCodec::default().with_crc_scope(CrcScope::IncludeStx);
        let bytes = firmware.build(1, 2, 0).unwrap();
        assert!(firmware.parse(&bytes).is_ok());
        assert!(matches!(
            FrameCodec::default().parse(&bytes),
            Err(Error::Checksum { .. })
        ));
    }

    #[test]
    fn frame_len_needs_len_byte() {
        let codec = FrameCodec::default();
        assert_eq!(codec.frame_len(&[]), None);
        assert_eq!(codec.frame_len(&[0xA5]), None);
        assert_eq!(codec.frame_len(&[0xA5, 0x02]), Some(6));
        assert_eq!(codec.frame_len(&[0xA5, 0xFF, 0x00]), Some(MAX_FRAME));
    }

    // ---------------------------------------------------------------
    // Properties over random frames
    // ---------------------------------------------------------------

    #[test]
    fn round_trip_random_frames() {
        let mut rng = rand::thread_rng();
        for scope in [CrcScope::ExcludeStx, CrcScope::IncludeStx] {
            let codec = FrameCodec::new(rng.r#gen()).with_crc_scope(scope);
            for _ in 0..300 {
                let addr: u8 = rng.r#gen();
                let cmd: u8 = rng.r#gen();
                let len = rng.gen_range(0..=MAX_PAYLOAD);
                let payload: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();

                let bytes = codec.encode(&Frame::new(addr, cmd, payload.clone())).unwrap();
                let frame = codec.parse(&bytes).unwrap();
                assert_eq!(frame, Frame::new(addr, cmd, payload));
            }
        }
    }

    #[test]
    fn parse_inverts_build() {
        let mut rng = rand::thread_rng();
        for scope in [CrcScope::ExcludeStx, CrcScope::IncludeStx] {
            let codec = FrameCodec::default().with_crc_scope(scope);
            for _ in 0..300 {
                let addr: u8 = rng.r#gen();
                let cmd: u8 = rng.r#gen();
                // A single raw byte is widened to two, so it cannot round-trip.
                let len = match rng.gen_range(0..=MAX_PAYLOAD) {
                    1 => 0,
                    n => n,
                };
                let payload: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();

                let bytes = codec.build(addr, cmd, payload.clone()).unwrap();
                let frame = codec.parse(&bytes).unwrap();
                assert_eq!(frame, Frame::new(addr, cmd, payload));
            }

            let value: u8 = rng.r#gen();
            let frame = codec.parse(&codec.build(1, 2, value).unwrap()).unwrap();
            assert_eq!(frame.payload, vec![0x00, value]);
        }
    }

    #[test]
    fn status_is_first_payload_byte() {
        assert_eq!(Frame::new(1, 0x10, vec![0x00, 0x19]).status(), Some(0x00));
        assert_eq!(Frame::new(1, 0x10, vec![0x03]).status(), Some(0x03));
        assert_eq!(Frame::new(1, 0x02, Vec::new()).status(), None);
    }

    #[test]
    fn single_byte_corruption_is_detected() {
        let mut rng = rand::thread_rng();
        let codec = FrameCodec::default();
        for _ in 0..50 {
            let len = rng.gen_range(0..=40);
            let payload: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
            let bytes = codec.build(rng.r#gen::<u8>(), rng.r#gen::<u8>(), payload).unwrap();

            // Everything after LEN is covered by the CRC.
            for index in 2..bytes.len() {
                let mut corrupted = bytes.clone();
                corrupted[index] ^= rng.gen_range(1..=255u8);
                assert!(
                    matches!(codec.parse(&corrupted), Err(Error::Checksum { .. })),
                    "corruption at {index} not detected in {corrupted:02X?}"
                );
            }

            let mut bad_stx = bytes.clone();
            bad_stx[0] ^= rng.gen_range(1..=255u8);
            assert!(matches!(codec.parse(&bad_stx), Err(Error::Format(_))));

            let mut long_len = bytes.clone();
            long_len[1] += 1;
            assert!(matches!(codec.parse(&long_len), Err(Error::Format(_))));
        }
    }

    #[test]
    fn codec_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameCodec>();

        let codec = FrameCodec::default();
        std::thread::scope(|s| {
            for addr in 0..8u8 {
                s.spawn(move || {
                    let bytes = codec.build(addr, 0x02, 0x00).unwrap();
                    assert_eq!(codec.parse(&bytes).unwrap().addr, addr);
                });
            }
        });
    }
}
