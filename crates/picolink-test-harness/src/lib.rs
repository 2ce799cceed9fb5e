//! picolink-test-harness: Test utilities for picolink.
//!
//! Provides [`MockTransport`] for deterministic tests of the frame codec
//! and command sender without a device attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
