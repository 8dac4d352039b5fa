//! # soapy-stream
//! This library moves blocks of typed samples between application code and a radio device
//! through SoapySDR-style streams: set a stream up for a direction and sample format, activate it,
//! push or pull per-channel buffers, and read back completion status.
//!
//! The device itself sits behind the [`DeviceTransport`] trait. This crate takes care of the part
//! in front of it:
//! * checking buffers against the channel count and format the stream was set up with,
//! * turning them into the raw per-channel addresses the device consumes, keeping them borrowed
//!   for exactly the duration of the call,
//! * refusing illegal lifecycle transitions (activating twice, writing to a closed stream, ...).
//!
//! ## Errors
//! Problems found before the device is touched are returned as [`StreamError`]. What the device
//! reports about an operation it did attempt is an [`ErrorCode`], always accompanied by a
//! [`StreamResult`] so partial transfers can be accounted for.
//!
//! ## Concurrency
//! Every call blocks until the device answers or the given timeout elapses. All stream
//! operations take `&mut self`; share a stream across threads behind your own lock.
//!
//! ## Example
//! ```
//! use soapy_stream::{BufferSet, ErrorCode, LoopbackTransport, RxStream, StreamConfig, StreamFlags, TxStream};
//! use std::sync::Arc;
//!
//! let device = Arc::new(LoopbackTransport::new(2));
//! let config = StreamConfig::for_sample::<f32>().channels([0, 1]);
//!
//! let mut tx = TxStream::setup(device.clone(), config.clone())?;
//! let mut rx = RxStream::setup(device.clone(), config)?;
//! tx.activate(StreamFlags::NONE, 0, 0)?;
//! rx.activate(StreamFlags::NONE, 0, 0)?;
//!
//! let left = vec![0.5f32; 256];
//! let right = vec![-0.5f32; 256];
//! let (code, result) = tx.write(&BufferSet::new(&[left.as_slice(), right.as_slice()]), 0, 100_000)?;
//! assert_eq!(code, ErrorCode::None);
//! assert_eq!(result.num_elems, 256);
//!
//! let mut a = vec![0.0f32; 256];
//! let mut b = vec![0.0f32; 256];
//! let (code, _) = rx.read(&mut [a.as_mut_slice(), b.as_mut_slice()], 100_000)?;
//! assert_eq!(code, ErrorCode::None);
//! assert_eq!(a, left);
//!
//! tx.close()?;
//! rx.close()?;
//! # Ok::<(), soapy_stream::StreamError>(())
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod loopback;
pub mod marshal;
pub mod result;
pub mod stream;
pub mod transport;
pub mod validate;

pub use config::StreamConfig;
pub use error::{ErrorCode, StreamError, TransportError};
pub use format::{FormatTag, Sample, format_tag_of};
pub use loopback::LoopbackTransport;
pub use marshal::{AddressList, PinGuard};
pub use result::{StreamFlags, StreamResult, Timestamp};
pub use stream::{RxStream, Stream, StreamState, TxStream};
pub use transport::{DeviceTransport, Direction, StreamArgs};
pub use validate::{BufferSet, validate};

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
