//! Stream lifecycle: `Inactive` once set up, `Active` between a successful activate and a
//! successful deactivate, `Closed` for good after close.
//!
//! Illegal transitions are refused with [`StreamError::InvalidOperation`] before the transport
//! is called. Every operation takes `&mut self`, so one stream is only ever driven from one
//! place at a time.

mod rx;
mod tx;

#[cfg(test)]
mod mock;

pub use rx::RxStream;
pub use tx::TxStream;

use crate::config::StreamConfig;
use crate::error::{ErrorCode, StreamError};
use crate::format::FormatTag;
use crate::result::StreamFlags;
use crate::transport::{DeviceTransport, Direction, StreamArgs};
use crate::validate::{self, BufferSet};
use log::{debug, warn};
use std::{fmt, sync::Arc};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StreamState {
    Inactive,
    Active,
    Closed,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StreamState::Inactive => f.write_str("inactive"),
            StreamState::Active => f.write_str("active"),
            StreamState::Closed => f.write_str("closed"),
        }
    }
}

/// Direction-independent part of a stream: the handle, what it was negotiated with, and its
/// lifecycle. Reached through [`TxStream`] and [`RxStream`].
///
/// A stream still open when dropped is deactivated (if needed) and closed.
pub struct Stream<D: DeviceTransport> {
    device: Arc<D>,
    /// `None` exactly when closed
    handle: Option<D::Handle>,
    direction: Direction,
    format: FormatTag,
    channels: Vec<usize>,
    args: StreamArgs,
    state: StreamState,
}

impl<D: DeviceTransport> Stream<D> {
    fn setup(device: Arc<D>, direction: Direction, config: StreamConfig) -> Result<Self, StreamError> {
        let StreamConfig {
            format,
            channels,
            args,
        } = config;

        let handle = device.setup_stream(direction, format, &channels, &args)?;
        debug!(
            "Set up {} stream on {} (format: {}, channels: {:?})",
            direction,
            device.driver_key(),
            format,
            channels
        );

        Ok(Stream {
            device,
            handle: Some(handle),
            direction,
            format,
            channels,
            args,
            state: StreamState::Inactive,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }

    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    pub fn args(&self) -> &StreamArgs {
        &self.args
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == StreamState::Active
    }

    /// Maximum elements per channel one transfer can carry.
    pub fn mtu(&self) -> Result<usize, StreamError> {
        Ok(self.device.stream_mtu(self.open_handle()?))
    }

    /// Checks `buffs` against this stream's channel count and format.
    pub fn validate<T: 'static>(&self, buffs: Option<&BufferSet<'_, T>>) -> Result<(), StreamError> {
        validate::validate(self.format, self.channels.len(), buffs)
    }

    /// Starts streaming. A transport code other than `None` is returned as is and leaves the
    /// stream inactive.
    pub fn activate(
        &mut self,
        flags: StreamFlags,
        time_ns: i64,
        num_elems: usize,
    ) -> Result<ErrorCode, StreamError> {
        match self.state {
            StreamState::Closed => return Err(StreamError::InvalidOperation("stream is closed")),
            StreamState::Active => {
                return Err(StreamError::InvalidOperation("stream is already active"));
            }
            StreamState::Inactive => {}
        }

        let ret = self
            .device
            .activate_stream(self.open_handle()?, flags, time_ns, num_elems);

        if ret.is_ok() {
            self.state = StreamState::Active;
            debug!("Activated {} stream", self.direction);
        } else {
            warn!("Activating {} stream failed: {}", self.direction, ret);
        }
        Ok(ret)
    }

    /// Stops streaming. Success returns the stream to `Inactive`.
    pub fn deactivate(&mut self, flags: StreamFlags, time_ns: i64) -> Result<ErrorCode, StreamError> {
        match self.state {
            StreamState::Closed => return Err(StreamError::InvalidOperation("stream is closed")),
            StreamState::Inactive => {
                return Err(StreamError::InvalidOperation("stream is already inactive"));
            }
            StreamState::Active => {}
        }

        let ret = self
            .device
            .deactivate_stream(self.open_handle()?, flags, time_ns);

        if ret.is_ok() {
            self.state = StreamState::Inactive;
            debug!("Deactivated {} stream", self.direction);
        } else {
            warn!("Deactivating {} stream failed: {}", self.direction, ret);
        }
        Ok(ret)
    }

    /// Releases the handle. Closing twice is an error, not a no-op.
    pub fn close(&mut self) -> Result<(), StreamError> {
        let handle = self
            .handle
            .take()
            .ok_or(StreamError::InvalidOperation("stream is already closed"))?;

        self.device.close_stream(handle);
        self.state = StreamState::Closed;
        debug!("Closed {} stream", self.direction);
        Ok(())
    }

    fn open_handle(&self) -> Result<&D::Handle, StreamError> {
        self.handle
            .as_ref()
            .ok_or(StreamError::InvalidOperation("stream is closed"))
    }

    fn device(&self) -> &D {
        &self.device
    }
}

impl<D: DeviceTransport> Drop for Stream<D> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        warn!("{} stream dropped while open, releasing it", self.direction);
        if self.state == StreamState::Active {
            let ret = self.device.deactivate_stream(&handle, StreamFlags::NONE, 0);
            if !ret.is_ok() {
                warn!("Deactivating dropped {} stream failed: {}", self.direction, ret);
            }
        }
        self.device.close_stream(handle);
        self.state = StreamState::Closed;
    }
}

impl<D: DeviceTransport> fmt::Display for Stream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {} stream (format: {}, channels: {:?})",
            self.device.driver_key(),
            self.device.hardware_key(),
            self.state,
            self.direction,
            self.format,
            self.channels
        )
    }
}

impl<D: DeviceTransport> fmt::Debug for Stream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("direction", &self.direction)
            .field("format", &self.format)
            .field("channels", &self.channels)
            .field("args", &self.args)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
