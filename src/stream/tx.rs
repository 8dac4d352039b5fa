use super::Stream;
use crate::config::StreamConfig;
use crate::error::{ErrorCode, StreamError};
use crate::format::Sample;
use crate::marshal::{marshal, marshal_raw};
use crate::result::StreamResult;
use crate::transport::{DeviceTransport, Direction};
use crate::validate::BufferSet;
use log::trace;
use std::{
    ffi::c_void,
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// A stream sending samples to the device.
///
/// Lifecycle operations (`activate`, `deactivate`, `close`, `mtu`, ...) are those of the
/// underlying [`Stream`].
pub struct TxStream<D: DeviceTransport> {
    stream: Stream<D>,
}

impl<D: DeviceTransport> TxStream<D> {
    pub fn setup(device: Arc<D>, config: StreamConfig) -> Result<Self, StreamError> {
        Ok(TxStream {
            stream: Stream::setup(device, Direction::Tx, config)?,
        })
    }

    /// Validates `buffs`, then writes all of their elements in one transport call. The
    /// transport's code and result record come back unchanged; the result may report fewer
    /// elements than were offered.
    pub fn write<T: Sample>(
        &mut self,
        buffs: &BufferSet<'_, T>,
        time_ns: i64,
        timeout_us: i64,
    ) -> Result<(ErrorCode, StreamResult), StreamError> {
        let handle = self.stream.open_handle()?;
        self.stream.validate(Some(buffs))?;

        let num_elems = buffs.num_elems();
        let (addresses, pins) = marshal(buffs);
        trace!(
            "Writing {} elements on {} channels (timeout {}us)",
            num_elems,
            addresses.len(),
            timeout_us
        );

        // SAFETY: validation left one address per stream channel, each spanning `num_elems`
        // elements of the stream format, and `pins` keeps them borrowed past the call.
        let output = unsafe {
            self.stream.device().write_stream(
                handle,
                addresses.as_slice(),
                num_elems,
                time_ns,
                timeout_us,
            )
        };
        drop(pins);

        Ok(output)
    }

    pub fn write_slices<T: Sample>(
        &mut self,
        buffs: &[&[T]],
        time_ns: i64,
        timeout_us: i64,
    ) -> Result<(ErrorCode, StreamResult), StreamError> {
        self.write(&BufferSet::new(buffs), time_ns, timeout_us)
    }

    /// Write on a single-channel stream.
    pub fn write_single<T: Sample>(
        &mut self,
        buff: &[T],
        time_ns: i64,
        timeout_us: i64,
    ) -> Result<(ErrorCode, StreamResult), StreamError> {
        self.write(&BufferSet::single(buff), time_ns, timeout_us)
    }

    /// Writes from caller-managed memory, skipping validation.
    ///
    /// # Safety
    /// `buffs` must hold one address per stream channel, each pointing to at least `num_elems`
    /// readable elements of the stream format that stay valid for the duration of the call.
    pub unsafe fn write_raw(
        &mut self,
        buffs: &[*const c_void],
        num_elems: usize,
        time_ns: i64,
        timeout_us: i64,
    ) -> Result<(ErrorCode, StreamResult), StreamError> {
        let handle = self.stream.open_handle()?;
        let addresses = marshal_raw(buffs);
        trace!("Writing {} elements from raw addresses", num_elems);

        // SAFETY: upheld by the caller
        Ok(unsafe {
            self.stream.device().write_stream(
                handle,
                addresses.as_slice(),
                num_elems,
                time_ns,
                timeout_us,
            )
        })
    }

    /// Asks the transport how the outstanding writes went (bursts ended, late or dropped
    /// samples, ...).
    pub fn read_status(&mut self, timeout_us: i64) -> Result<(ErrorCode, StreamResult), StreamError> {
        let handle = self.stream.open_handle()?;
        Ok(self.stream.device().read_stream_status(handle, timeout_us))
    }
}

impl<D: DeviceTransport> Deref for TxStream<D> {
    type Target = Stream<D>;

    fn deref(&self) -> &Stream<D> {
        &self.stream
    }
}

impl<D: DeviceTransport> DerefMut for TxStream<D> {
    fn deref_mut(&mut self) -> &mut Stream<D> {
        &mut self.stream
    }
}

impl<D: DeviceTransport> fmt::Debug for TxStream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TxStream").field(&self.stream).finish()
    }
}

impl<D: DeviceTransport> fmt::Display for TxStream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.stream.fmt(f)
    }
}
