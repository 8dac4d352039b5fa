//! The device transport boundary: whatever actually moves samples to and from the radio.

use crate::error::{ErrorCode, TransportError};
use crate::format::FormatTag;
use crate::result::{StreamFlags, StreamResult};
use std::{collections::HashMap, ffi::c_void, fmt};

/// Generic key/value property bag handed to the transport at setup.
pub type StreamArgs = HashMap<String, String>;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Tx,
    Rx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Direction::Tx => f.write_str("TX"),
            Direction::Rx => f.write_str("RX"),
        }
    }
}

/// Calls a stream makes into the device. All calls block until the device answers or the
/// given timeout runs out.
///
/// Methods take `&self` as a device may carry several streams at once; per-stream exclusivity
/// is enforced by the stream types, not here.
pub trait DeviceTransport {
    /// Opaque per-stream resource. Consumed by [`DeviceTransport::close_stream`].
    type Handle;

    fn driver_key(&self) -> &str;

    fn hardware_key(&self) -> &str;

    fn setup_stream(
        &self,
        direction: Direction,
        format: FormatTag,
        channels: &[usize],
        args: &StreamArgs,
    ) -> Result<Self::Handle, TransportError>;

    fn activate_stream(
        &self,
        handle: &Self::Handle,
        flags: StreamFlags,
        time_ns: i64,
        num_elems: usize,
    ) -> ErrorCode;

    fn deactivate_stream(&self, handle: &Self::Handle, flags: StreamFlags, time_ns: i64)
    -> ErrorCode;

    fn close_stream(&self, handle: Self::Handle);

    /// # Safety
    /// Every address must point to at least `num_elems` readable elements of the stream's
    /// format, valid for the duration of the call.
    unsafe fn write_stream(
        &self,
        handle: &Self::Handle,
        buffs: &[*const c_void],
        num_elems: usize,
        time_ns: i64,
        timeout_us: i64,
    ) -> (ErrorCode, StreamResult);

    /// # Safety
    /// Every address must point to at least `num_elems` writable elements of the stream's
    /// format, valid and not otherwise accessed for the duration of the call.
    unsafe fn read_stream(
        &self,
        handle: &Self::Handle,
        buffs: &[*mut c_void],
        num_elems: usize,
        timeout_us: i64,
    ) -> (ErrorCode, StreamResult);

    fn read_stream_status(&self, handle: &Self::Handle, timeout_us: i64)
    -> (ErrorCode, StreamResult);

    /// Maximum number of elements per channel a single transfer can carry
    fn stream_mtu(&self, handle: &Self::Handle) -> usize;
}
