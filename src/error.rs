//! The two error families of the streaming path.
//!
//! [`StreamError`] is raised before any transport call is issued (malformed buffers, an illegal
//! lifecycle transition, a failed setup) and always leaves the stream untouched.
//! [`ErrorCode`] is what the transport hands back for an operation it did attempt; it is
//! returned alongside a [`crate::StreamResult`], never raised.

use crate::format::FormatTag;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Buffer set is absent")]
    NullBufferSet,
    #[error("Expected {expected} channels, found {found} buffers")]
    ChannelCountMismatch { expected: usize, found: usize },
    #[error("Expected format \"{expected}\", found format \"{found}\"")]
    FormatMismatch { expected: FormatTag, found: FormatTag },
    #[error("Buffer for channel {0} is absent")]
    NullChannelBuffer(usize),
    #[error("All channel buffers must be of the same length, found lengths {0:?}")]
    UnevenChannelLengths(Vec<usize>),
    #[error("Type {type_name} is not a supported sample type: {reason}")]
    UnsupportedFormat {
        type_name: &'static str,
        reason: String,
    },
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("Transport could not set up the stream")]
    Setup(#[from] TransportError),
}

/// Failure reported by [`crate::DeviceTransport::setup_stream`].
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Format {0} is not supported by the device")]
    UnsupportedFormat(FormatTag),
    #[error("Channel {0} does not exist on the device")]
    InvalidChannel(usize),
    #[error("Device error: {0}")]
    Device(String),
}

/// Outcome of a transport operation. `None` is success.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ErrorCode {
    #[default]
    None,
    Timeout,
    StreamError,
    Corruption,
    Overflow,
    Underflow,
    NotSupported,
    /// Not produced by native drivers, only by transports that have a notion of a finite stream.
    EndOfStream,
    Generic,
}

impl ErrorCode {
    /// Maps a native driver return value. Non-negative values are element counts or plain
    /// success and map to `None`; the native "time error" and anything unknown become `Generic`.
    pub fn from_raw(code: i32) -> ErrorCode {
        match code {
            c if c >= 0 => ErrorCode::None,
            -1 => ErrorCode::Timeout,
            -2 => ErrorCode::StreamError,
            -3 => ErrorCode::Corruption,
            -4 => ErrorCode::Overflow,
            -5 => ErrorCode::NotSupported,
            -7 => ErrorCode::Underflow,
            _ => ErrorCode::Generic,
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == ErrorCode::None
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            ErrorCode::None => "no error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::StreamError => "stream error",
            ErrorCode::Corruption => "corruption",
            ErrorCode::Overflow => "overflow",
            ErrorCode::Underflow => "underflow",
            ErrorCode::NotSupported => "not supported",
            ErrorCode::EndOfStream => "end of stream",
            ErrorCode::Generic => "generic error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
