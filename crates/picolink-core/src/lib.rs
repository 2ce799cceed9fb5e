//! picolink-core: Core error type and transport trait for picolink.
//!
//! Every other crate in the workspace depends on these definitions. The
//! framing codec reports its failures through [`Error`], and the command
//! sender talks to hardware only through [`Transport`].
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Error`] / [`Result`] -- error handling
//! - [`hex_string`] / [`parse_hex_bytes`] -- frame dump helpers

pub mod error;
pub mod helpers;
pub mod transport;

pub use error::{Error, Result};
pub use helpers::{hex_string, parse_hex_bytes};
pub use transport::Transport;
