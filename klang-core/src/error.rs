//! Error types for klang.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.
//! System-call failures carry the original `std::io::Error` so the raw OS error
//! code survives untranslated.

use crate::version::ProtocolVersion;
use std::io;
use thiserror::Error;

/// Result type alias for klang control operations.
pub type Result<T> = std::result::Result<T, CtlError>;

/// Main error type for control transports.
#[derive(Error, Debug)]
pub enum CtlError {
    /// A system call against the device failed. The OS error code is
    /// preserved verbatim in `source`.
    #[error("{op} failed: {source}")]
    Sys {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The device reported a control protocol version outside the
    /// supported window. Raised once at open; the handle is not usable.
    #[error("control protocol version {reported} is incompatible with supported {supported}")]
    IncompatibleVersion { reported: ProtocolVersion, supported: ProtocolVersion },

    /// A version-gated operation was invoked on a backend whose negotiated
    /// protocol is too old.
    #[error("operation requires control protocol {required}, negotiated {negotiated}")]
    NotSupported { required: ProtocolVersion, negotiated: ProtocolVersion },

    /// Card index outside the valid range.
    #[error("invalid card index {card} (must be below {max})")]
    InvalidCard { card: u32, max: u32 },

    /// Malformed argument to a control operation.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Allocation of the TLV transmission buffer failed.
    #[error("transmission buffer allocation failed")]
    OutOfMemory,

    /// A TLV read result would not fit in the caller's buffer.
    #[error("TLV response of {needed} bytes exceeds buffer capacity of {capacity} bytes")]
    TlvTooLarge { needed: usize, capacity: usize },

    /// An event read returned a size other than the fixed event record size.
    #[error("control event size mismatch: expected {expected} bytes, got {got}")]
    UnexpectedEventSize { expected: usize, got: usize },

    /// Operation issued after `close()`.
    #[error("control handle is closed")]
    Closed,

    /// Backend configuration node is malformed.
    #[error("invalid control configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl CtlError {
    pub(crate) fn sys(op: &'static str, source: io::Error) -> Self {
        Self::Sys { op, source }
    }

    /// The raw OS error code for system-call failures, if any.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            Self::Sys { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
