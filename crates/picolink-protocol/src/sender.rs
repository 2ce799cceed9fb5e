//! CommandSender -- drives a [`Transport`] with framed commands.
//!
//! The sender owns the transport and a [`FrameCodec`]. Outbound, it builds
//! a frame, writes it, and hands back the exact bytes written so callers
//! can log what went on the wire. Inbound, it either returns whatever
//! bytes arrive ([`read_any`](CommandSender::read_any)) or runs a
//! length-aware loop until one complete frame is buffered
//! ([`read_frame`](CommandSender::read_frame)).
//!
//! Nothing here retries. A timeout, a checksum mismatch, or a transport
//! error goes straight back to the caller.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use picolink_core::error::{Error, Result};
use picolink_core::transport::Transport;

use crate::frame::{Frame, FrameCodec, MAX_FRAME, MIN_FRAME, MIN_LEN};
use crate::value::Value;

/// Sends command frames to a device and reads its replies.
pub struct CommandSender {
    transport: Box<dyn Transport>,
    codec: FrameCodec,
    read_timeout: Duration,
    /// Bytes received but not yet returned as part of a frame.
    rx_buf: BytesMut,
}

impl CommandSender {
    /// Create a sender over an already-open transport.
    ///
    /// Most callers go through [`SenderBuilder`](crate::builder::SenderBuilder)
    /// instead.
    pub fn new(transport: Box<dyn Transport>, codec: FrameCodec, read_timeout: Duration) -> Self {
        CommandSender {
            transport,
            codec,
            read_timeout,
            rx_buf: BytesMut::with_capacity(MAX_FRAME * 2),
        }
    }

    pub fn codec(&self) -> FrameCodec {
        self.codec
    }

    /// The STX marker this sender frames with.
    pub fn stx(&self) -> u8 {
        self.codec.stx()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Build a frame, write it to the transport, and return the bytes sent.
    ///
    /// See [`FrameCodec::build`] for how `addr`, `cmd`, and `data` are
    /// coerced.
    pub async fn send(
        &mut self,
        addr: impl Into<Value>,
        cmd: impl Into<Value>,
        data: impl Into<Value>,
    ) -> Result<Vec<u8>> {
        let frame = self.codec.build(addr, cmd, data)?;
        debug!(bytes = frame.len(), data = ?frame, "TX frame");
        self.transport.send(&frame).await?;
        Ok(frame)
    }

    /// Return up to `max_bytes` of whatever the device has sent.
    ///
    /// Bytes left over from an earlier [`read_frame`](Self::read_frame) are
    /// returned first. Otherwise this performs one transport read; a
    /// timeout yields an empty vector rather than an error.
    pub async fn read_any(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        if !self.rx_buf.is_empty() {
            let n = self.rx_buf.len().min(max_bytes);
            return Ok(self.rx_buf.split_to(n).to_vec());
        }

        let mut buf = vec![0u8; max_bytes];
        match self.transport.receive(&mut buf, self.read_timeout).await {
            Ok(n) => {
                buf.truncate(n);
                trace!(bytes = n, "RX raw");
                Ok(buf)
            }
            Err(Error::Timeout) => {
                trace!(timeout_ms = self.read_timeout.as_millis(), "RX nothing");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Read until one complete frame is buffered, then validate it.
    ///
    /// Bytes before the first STX are discarded. The whole call is bounded
    /// by the sender's read timeout. Bytes following the frame stay
    /// buffered for the next call.
    ///
    /// When the candidate frame fails validation, only its STX byte is
    /// dropped so the next call can resynchronize on a later marker.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; MAX_FRAME];

        loop {
            self.skip_to_stx();

            if let Some(total) = self.codec.frame_len(&self.rx_buf) {
                if total < MIN_FRAME {
                    let len = self.rx_buf[1];
                    self.rx_buf.advance(1);
                    return Err(Error::Format(format!(
                        "bad LEN: {len}, must be at least {MIN_LEN}"
                    )));
                }
                if self.rx_buf.len() >= total {
                    return match self.codec.parse(&self.rx_buf[..total]) {
                        Ok(frame) => {
                            debug!(
                                bytes = total,
                                data = ?&self.rx_buf[..total],
                                "RX frame"
                            );
                            self.rx_buf.advance(total);
                            Ok(frame)
                        }
                        Err(e) => {
                            warn!(error = %e, "dropping invalid frame candidate");
                            self.rx_buf.advance(1);
                            Err(e)
                        }
                    };
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                trace!(buffered = self.rx_buf.len(), "frame read timed out");
                return Err(Error::Timeout);
            }

            let n = self.transport.receive(&mut chunk, remaining).await?;
            if n == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }
            trace!(bytes = n, data = ?&chunk[..n], "RX chunk");
            self.rx_buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Send a command and wait for the framed reply.
    ///
    /// A stray STX in line noise just ahead of the reply is taken as the
    /// start of a frame, so this can fail with [`Error::Checksum`] (or
    /// `Format`) even though the real reply has arrived. The reply stays
    /// buffered; a following [`read_frame`](Self::read_frame) returns it.
    pub async fn transact(
        &mut self,
        addr: impl Into<Value>,
        cmd: impl Into<Value>,
        data: impl Into<Value>,
    ) -> Result<Frame> {
        self.send(addr, cmd, data).await?;
        self.read_frame().await
    }

    /// Drop any buffered receive bytes. Returns how many were discarded.
    pub fn discard_buffered(&mut self) -> usize {
        let n = self.rx_buf.len();
        self.rx_buf.clear();
        n
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.rx_buf.clear();
        self.transport.close().await
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Discard noise ahead of the first STX marker.
    fn skip_to_stx(&mut self) {
        let stx = self.codec.stx();
        let skip = self
            .rx_buf
            .iter()
            .position(|&b| b == stx)
            .unwrap_or(self.rx_buf.len());
        if skip > 0 {
            warn!(bytes = skip, data = ?&self.rx_buf[..skip], "discarding bytes before STX");
            self.rx_buf.advance(skip);
        }
    }
}
