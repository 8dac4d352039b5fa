//! Scriptable transport that counts every call made into it.

use crate::error::{ErrorCode, TransportError};
use crate::format::FormatTag;
use crate::result::{StreamFlags, StreamResult};
use crate::transport::{DeviceTransport, Direction, StreamArgs};
use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    ffi::c_void,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Calls {
    pub setup: usize,
    pub activate: usize,
    pub deactivate: usize,
    pub close: usize,
    pub write: usize,
    pub read: usize,
    pub status: usize,
    pub mtu: usize,
}

#[derive(Default)]
pub struct MockTransport {
    calls: Cell<Calls>,
    next_handle: Cell<u32>,
    active: RefCell<HashSet<u32>>,
    closed: RefCell<Vec<u32>>,
    last_addresses: RefCell<Vec<usize>>,
    pub last_num_elems: Cell<usize>,
    pub fail_setup: Cell<bool>,
    pub activate_code: Cell<ErrorCode>,
    pub deactivate_code: Cell<ErrorCode>,
    /// Code returned by writes, reads and status queries on active streams
    pub io_code: Cell<ErrorCode>,
    /// Overrides the element count reported by writes and reads
    pub io_elems: Cell<Option<usize>>,
    pub panic_on_write: Cell<bool>,
}

impl MockTransport {
    pub const MTU: usize = 4096;

    pub fn calls(&self) -> Calls {
        self.calls.get()
    }

    pub fn closed_handles(&self) -> Vec<u32> {
        self.closed.borrow().clone()
    }

    pub fn last_addresses(&self) -> Vec<usize> {
        self.last_addresses.borrow().clone()
    }

    fn count(&self, f: impl FnOnce(&mut Calls)) {
        let mut calls = self.calls.get();
        f(&mut calls);
        self.calls.set(calls);
    }

    fn transfer(&self, handle: u32, addresses: Vec<usize>, num_elems: usize, timeout_us: i64) -> (ErrorCode, StreamResult) {
        *self.last_addresses.borrow_mut() = addresses;
        self.last_num_elems.set(num_elems);

        if !self.active.borrow().contains(&handle) {
            return (ErrorCode::StreamError, StreamResult::default());
        }

        let result = StreamResult {
            num_elems: self.io_elems.get().unwrap_or(num_elems),
            timeout_us,
            ..Default::default()
        };
        (self.io_code.get(), result)
    }
}

impl DeviceTransport for MockTransport {
    type Handle = u32;

    fn driver_key(&self) -> &str {
        "mock"
    }

    fn hardware_key(&self) -> &str {
        "mock-0"
    }

    fn setup_stream(
        &self,
        _direction: Direction,
        format: FormatTag,
        _channels: &[usize],
        _args: &StreamArgs,
    ) -> Result<u32, TransportError> {
        self.count(|c| c.setup += 1);
        if self.fail_setup.get() {
            return Err(TransportError::UnsupportedFormat(format));
        }
        let handle = self.next_handle.get() + 1;
        self.next_handle.set(handle);
        Ok(handle)
    }

    fn activate_stream(&self, handle: &u32, _flags: StreamFlags, _time_ns: i64, _num_elems: usize) -> ErrorCode {
        self.count(|c| c.activate += 1);
        let code = self.activate_code.get();
        if code.is_ok() {
            self.active.borrow_mut().insert(*handle);
        }
        code
    }

    fn deactivate_stream(&self, handle: &u32, _flags: StreamFlags, _time_ns: i64) -> ErrorCode {
        self.count(|c| c.deactivate += 1);
        let code = self.deactivate_code.get();
        if code.is_ok() {
            self.active.borrow_mut().remove(handle);
        }
        code
    }

    fn close_stream(&self, handle: u32) {
        self.count(|c| c.close += 1);
        self.active.borrow_mut().remove(&handle);
        self.closed.borrow_mut().push(handle);
    }

    unsafe fn write_stream(
        &self,
        handle: &u32,
        buffs: &[*const c_void],
        num_elems: usize,
        time_ns: i64,
        timeout_us: i64,
    ) -> (ErrorCode, StreamResult) {
        self.count(|c| c.write += 1);
        if self.panic_on_write.get() {
            panic!("mock transport failure during write");
        }
        let addresses = buffs.iter().map(|p| *p as usize).collect();
        let (code, mut result) = self.transfer(*handle, addresses, num_elems, timeout_us);
        result.time_ns = time_ns;
        (code, result)
    }

    unsafe fn read_stream(
        &self,
        handle: &u32,
        buffs: &[*mut c_void],
        num_elems: usize,
        timeout_us: i64,
    ) -> (ErrorCode, StreamResult) {
        self.count(|c| c.read += 1);
        let addresses = buffs.iter().map(|p| *p as usize).collect();
        self.transfer(*handle, addresses, num_elems, timeout_us)
    }

    fn read_stream_status(&self, _handle: &u32, timeout_us: i64) -> (ErrorCode, StreamResult) {
        self.count(|c| c.status += 1);
        let result = StreamResult {
            flags: StreamFlags::END_BURST,
            timeout_us,
            chan_mask: 0b11,
            ..Default::default()
        };
        (self.io_code.get(), result)
    }

    fn stream_mtu(&self, _handle: &u32) -> usize {
        self.count(|c| c.mtu += 1);
        MockTransport::MTU
    }
}
