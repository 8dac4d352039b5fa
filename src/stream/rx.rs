use super::Stream;
use crate::config::StreamConfig;
use crate::error::{ErrorCode, StreamError};
use crate::format::Sample;
use crate::marshal::{marshal_mut, marshal_raw};
use crate::result::StreamResult;
use crate::transport::{DeviceTransport, Direction};
use crate::validate::validate_mut;
use log::trace;
use std::{
    ffi::c_void,
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// A stream receiving samples from the device.
pub struct RxStream<D: DeviceTransport> {
    stream: Stream<D>,
}

impl<D: DeviceTransport> RxStream<D> {
    pub fn setup(device: Arc<D>, config: StreamConfig) -> Result<Self, StreamError> {
        Ok(RxStream {
            stream: Stream::setup(device, Direction::Rx, config)?,
        })
    }

    /// Fills `buffs` (one per channel, all the same length) in one transport call. The result
    /// tells how many elements per channel were actually read.
    pub fn read<T: Sample>(
        &mut self,
        buffs: &mut [&mut [T]],
        timeout_us: i64,
    ) -> Result<(ErrorCode, StreamResult), StreamError> {
        let handle = self.stream.open_handle()?;
        validate_mut(self.stream.format(), self.stream.channels().len(), buffs)?;

        let num_elems = buffs.first().map_or(0, |b| b.len());
        let (addresses, pins) = marshal_mut(buffs);
        trace!(
            "Reading {} elements on {} channels (timeout {}us)",
            num_elems,
            addresses.len(),
            timeout_us
        );

        // SAFETY: validated as for writes, and `pins` holds the exclusive borrow of every
        // buffer until the transport is done filling them.
        let output = unsafe {
            self.stream
                .device()
                .read_stream(handle, addresses.as_slice(), num_elems, timeout_us)
        };
        drop(pins);

        Ok(output)
    }

    /// Read on a single-channel stream.
    pub fn read_single<T: Sample>(
        &mut self,
        buff: &mut [T],
        timeout_us: i64,
    ) -> Result<(ErrorCode, StreamResult), StreamError> {
        self.read(&mut [buff], timeout_us)
    }

    /// Reads into caller-managed memory, skipping validation.
    ///
    /// # Safety
    /// `buffs` must hold one address per stream channel, each pointing to at least `num_elems`
    /// writable elements of the stream format, valid and untouched for the duration of the call.
    pub unsafe fn read_raw(
        &mut self,
        buffs: &[*mut c_void],
        num_elems: usize,
        timeout_us: i64,
    ) -> Result<(ErrorCode, StreamResult), StreamError> {
        let handle = self.stream.open_handle()?;
        let addresses = marshal_raw(buffs);

        // SAFETY: upheld by the caller
        Ok(unsafe {
            self.stream
                .device()
                .read_stream(handle, addresses.as_slice(), num_elems, timeout_us)
        })
    }
}

impl<D: DeviceTransport> Deref for RxStream<D> {
    type Target = Stream<D>;

    fn deref(&self) -> &Stream<D> {
        &self.stream
    }
}

impl<D: DeviceTransport> DerefMut for RxStream<D> {
    fn deref_mut(&mut self) -> &mut Stream<D> {
        &mut self.stream
    }
}

impl<D: DeviceTransport> fmt::Debug for RxStream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RxStream").field(&self.stream).finish()
    }
}

impl<D: DeviceTransport> fmt::Display for RxStream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.stream.fmt(f)
    }
}
