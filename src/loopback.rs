//! In-memory transport looping transmitted samples back to receive streams.
//!
//! Each device channel is a byte FIFO. Transmit streams append to the FIFOs of their channels,
//! receive streams drain them. Samples travel as raw native-endian bytes, so a receive stream
//! should use the same format as the transmit stream feeding it. Nothing ever blocks: a read
//! with no queued samples reports `Timeout` straight away, and a write to a channel already
//! holding [`LoopbackTransport::QUEUE_DEPTH`] transfers' worth of samples reports `Overflow`.

use crate::error::{ErrorCode, TransportError};
use crate::format::{FormatTag, Sample};
use crate::result::{StreamFlags, StreamResult};
use crate::transport::{DeviceTransport, Direction, StreamArgs};
use log::{debug, trace};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    ffi::c_void,
    slice,
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct LoopbackHandle(usize);

struct LoopbackStream {
    direction: Direction,
    format: FormatTag,
    channels: Vec<usize>,
    active: bool,
    last_write: Option<StreamResult>,
}

impl LoopbackStream {
    fn chan_mask(&self) -> usize {
        self.channels
            .iter()
            .fold(0, |mask, c| mask | 1usize.checked_shl(*c as u32).unwrap_or(0))
    }
}

#[derive(Default)]
struct LoopbackState {
    next_handle: usize,
    streams: HashMap<usize, LoopbackStream>,
    fifos: Vec<VecDeque<u8>>,
}

pub struct LoopbackTransport {
    mtu: usize,
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    pub const DEFAULT_MTU: usize = 1024;
    /// Channel FIFOs hold at most this many MTUs of samples
    pub const QUEUE_DEPTH: usize = 8;

    pub fn new(num_channels: usize) -> LoopbackTransport {
        LoopbackTransport {
            mtu: LoopbackTransport::DEFAULT_MTU,
            state: Mutex::new(LoopbackState {
                fifos: vec![VecDeque::new(); num_channels],
                ..Default::default()
            }),
        }
    }

    /// Caps every transfer at `mtu` elements per channel
    pub fn with_mtu(mut self, mtu: usize) -> LoopbackTransport {
        self.mtu = mtu;
        self
    }

    pub fn num_channels(&self) -> usize {
        self.lock().fifos.len()
    }

    /// Bytes waiting on `channel`
    pub fn queued_bytes(&self, channel: usize) -> usize {
        self.lock().fifos.get(channel).map_or(0, VecDeque::len)
    }

    /// Decodes the samples waiting on `channel` without consuming them.
    pub fn captured<T: Sample>(&self, channel: usize) -> Vec<T> {
        let state = self.lock();
        let Some(fifo) = state.fifos.get(channel) else {
            return Vec::new();
        };

        let bytes: Vec<u8> = fifo.iter().copied().collect();
        bytes
            .chunks_exact(T::FORMAT.element_size())
            .map(T::read_ne)
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn failed(timeout_us: i64) -> (ErrorCode, StreamResult) {
    (
        ErrorCode::StreamError,
        StreamResult {
            timeout_us,
            ..Default::default()
        },
    )
}

impl DeviceTransport for LoopbackTransport {
    type Handle = LoopbackHandle;

    fn driver_key(&self) -> &str {
        "loopback"
    }

    fn hardware_key(&self) -> &str {
        "memory"
    }

    fn setup_stream(
        &self,
        direction: Direction,
        format: FormatTag,
        channels: &[usize],
        _args: &StreamArgs,
    ) -> Result<LoopbackHandle, TransportError> {
        let mut state = self.lock();
        let mut seen = HashSet::new();
        if let Some(channel) = channels
            .iter()
            .find(|c| **c >= state.fifos.len() || !seen.insert(**c))
        {
            return Err(TransportError::InvalidChannel(*channel));
        }

        state.next_handle += 1;
        let id = state.next_handle;
        state.streams.insert(
            id,
            LoopbackStream {
                direction,
                format,
                channels: channels.to_vec(),
                active: false,
                last_write: None,
            },
        );
        debug!("Loopback {} stream {} on channels {:?}", direction, id, channels);
        Ok(LoopbackHandle(id))
    }

    fn activate_stream(
        &self,
        handle: &LoopbackHandle,
        _flags: StreamFlags,
        _time_ns: i64,
        _num_elems: usize,
    ) -> ErrorCode {
        match self.lock().streams.get_mut(&handle.0) {
            Some(stream) => {
                stream.active = true;
                ErrorCode::None
            }
            None => ErrorCode::StreamError,
        }
    }

    fn deactivate_stream(&self, handle: &LoopbackHandle, _flags: StreamFlags, _time_ns: i64) -> ErrorCode {
        match self.lock().streams.get_mut(&handle.0) {
            Some(stream) => {
                stream.active = false;
                ErrorCode::None
            }
            None => ErrorCode::StreamError,
        }
    }

    fn close_stream(&self, handle: LoopbackHandle) {
        self.lock().streams.remove(&handle.0);
        debug!("Loopback stream {} closed", handle.0);
    }

    unsafe fn write_stream(
        &self,
        handle: &LoopbackHandle,
        buffs: &[*const c_void],
        num_elems: usize,
        time_ns: i64,
        timeout_us: i64,
    ) -> (ErrorCode, StreamResult) {
        let mut state = self.lock();
        let LoopbackState { streams, fifos, .. } = &mut *state;

        let Some(stream) = streams.get_mut(&handle.0) else {
            return failed(timeout_us);
        };
        if stream.direction != Direction::Tx
            || !stream.active
            || buffs.len() != stream.channels.len()
            || buffs.iter().any(|p| p.is_null())
        {
            return failed(timeout_us);
        }

        let size = stream.format.element_size();
        let capacity = self.mtu * LoopbackTransport::QUEUE_DEPTH * size;
        let room = stream
            .channels
            .iter()
            .map(|c| capacity.saturating_sub(fifos[*c].len()) / size)
            .min()
            .unwrap_or(0);

        let count = num_elems.min(self.mtu).min(room);
        if count == 0 && num_elems > 0 {
            trace!("Loopback stream {} has no room left", handle.0);
            return (
                ErrorCode::Overflow,
                StreamResult {
                    timeout_us,
                    chan_mask: stream.chan_mask(),
                    ..Default::default()
                },
            );
        }

        let len = count * size;
        for (ptr, channel) in buffs.iter().zip(&stream.channels) {
            // SAFETY: the caller guarantees `num_elems` readable elements behind every address
            let bytes = unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len) };
            fifos[*channel].extend(bytes);
        }

        let mut flags = StreamFlags::NONE;
        if time_ns != 0 {
            flags |= StreamFlags::HAS_TIME;
        }
        let result = StreamResult {
            num_elems: count,
            flags,
            time_ns,
            timeout_us,
            chan_mask: stream.chan_mask(),
        };
        stream.last_write = Some(result);
        trace!("Loopback stream {} queued {} elements", handle.0, count);

        (ErrorCode::None, result)
    }

    unsafe fn read_stream(
        &self,
        handle: &LoopbackHandle,
        buffs: &[*mut c_void],
        num_elems: usize,
        timeout_us: i64,
    ) -> (ErrorCode, StreamResult) {
        let mut state = self.lock();
        let LoopbackState { streams, fifos, .. } = &mut *state;

        let Some(stream) = streams.get(&handle.0) else {
            return failed(timeout_us);
        };
        if stream.direction != Direction::Rx
            || !stream.active
            || buffs.len() != stream.channels.len()
            || buffs.iter().any(|p| p.is_null())
        {
            return failed(timeout_us);
        }

        let size = stream.format.element_size();
        let available = stream
            .channels
            .iter()
            .map(|c| fifos[*c].len() / size)
            .min()
            .unwrap_or(0);

        let mut result = StreamResult {
            timeout_us,
            chan_mask: stream.chan_mask(),
            ..Default::default()
        };
        if available == 0 {
            return (ErrorCode::Timeout, result);
        }

        let count = num_elems.min(self.mtu).min(available);
        let len = count * size;
        for (ptr, channel) in buffs.iter().zip(&stream.channels) {
            // SAFETY: the caller guarantees `num_elems` writable elements behind every address
            let out = unsafe { slice::from_raw_parts_mut(ptr.cast::<u8>(), len) };
            for (dst, src) in out.iter_mut().zip(fifos[*channel].drain(..len)) {
                *dst = src;
            }
        }
        trace!("Loopback stream {} delivered {} elements", handle.0, count);

        result.num_elems = count;
        (ErrorCode::None, result)
    }

    fn read_stream_status(&self, handle: &LoopbackHandle, timeout_us: i64) -> (ErrorCode, StreamResult) {
        let mut state = self.lock();
        let Some(stream) = state.streams.get_mut(&handle.0) else {
            return failed(timeout_us);
        };
        if stream.direction != Direction::Tx {
            return (
                ErrorCode::NotSupported,
                StreamResult {
                    timeout_us,
                    ..Default::default()
                },
            );
        }

        match stream.last_write.take() {
            Some(result) => (ErrorCode::None, result),
            None => (
                ErrorCode::Timeout,
                StreamResult {
                    timeout_us,
                    ..Default::default()
                },
            ),
        }
    }

    fn stream_mtu(&self, _handle: &LoopbackHandle) -> usize {
        self.mtu
    }
}
