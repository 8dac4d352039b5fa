//! Turns channel buffers into the flat list of raw addresses the transport consumes.
//!
//! Addresses taken from typed buffers come paired with a [`PinGuard`] that holds the borrow of
//! those buffers. While the guard lives the buffers can neither move, be freed nor (for receive
//! buffers) be touched by anyone else; dropping it releases them, on every exit path including
//! unwinding. Raw addresses from the caller skip the guard, their validity is the caller's
//! business.

use crate::validate::BufferSet;
use log::trace;
use std::{ffi::c_void, marker::PhantomData, ptr};

/// Channel-indexed raw addresses, `P` being `*const c_void` for transmit and `*mut c_void` for
/// receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressList<P> {
    addresses: Vec<P>,
}

impl<P> AddressList<P> {
    pub fn as_slice(&self) -> &[P] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Keeps the marshaled buffers borrowed for `'a`.
#[must_use = "dropping the guard releases the buffers its addresses point into"]
#[derive(Debug)]
pub struct PinGuard<'a> {
    pinned: usize,
    _borrow: PhantomData<&'a mut ()>,
}

impl PinGuard<'_> {
    /// Number of channel buffers held
    pub fn pinned(&self) -> usize {
        self.pinned
    }
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        trace!("Released {} pinned channel buffers", self.pinned);
    }
}

/// Takes the address of every channel buffer in order. An absent channel yields a null entry so
/// indices stay aligned; validated sets never contain one.
pub fn marshal<'a, T>(buffs: &'a BufferSet<'_, T>) -> (AddressList<*const c_void>, PinGuard<'a>) {
    let addresses: Vec<*const c_void> = buffs
        .channels()
        .iter()
        .map(|channel| channel.map_or(ptr::null(), |c| c.as_ptr().cast::<c_void>()))
        .collect();

    trace!("Pinned {} channel buffers", addresses.len());

    let guard = PinGuard {
        pinned: addresses.len(),
        _borrow: PhantomData,
    };
    (AddressList { addresses }, guard)
}

/// Mutable counterpart of [`marshal`] for buffers a receive call writes into.
pub fn marshal_mut<'a, T>(
    buffs: &'a mut [&mut [T]],
) -> (AddressList<*mut c_void>, PinGuard<'a>) {
    let addresses: Vec<*mut c_void> = buffs
        .iter_mut()
        .map(|channel| channel.as_mut_ptr().cast::<c_void>())
        .collect();

    trace!("Pinned {} mutable channel buffers", addresses.len());

    let guard = PinGuard {
        pinned: addresses.len(),
        _borrow: PhantomData,
    };
    (AddressList { addresses }, guard)
}

/// Wraps addresses of buffers managed outside this crate. Nothing is pinned.
pub fn marshal_raw<P: Copy>(addresses: &[P]) -> AddressList<P> {
    AddressList {
        addresses: addresses.to_vec(),
    }
}

#[cfg(test)]
mod marshal_tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn addresses_follow_channel_order() {
        let a = vec![1.0f32; 256];
        let b = vec![2.0f32; 256];
        let c = vec![3.0f32; 256];
        let buffs = BufferSet::new(&[a.as_slice(), b.as_slice(), c.as_slice()]);

        let (addresses, guard) = marshal(&buffs);
        assert_eq!(addresses.len(), 3);
        assert_eq!(guard.pinned(), 3);
        assert_eq!(addresses.as_slice()[0], a.as_ptr().cast::<c_void>());
        assert_eq!(addresses.as_slice()[1], b.as_ptr().cast::<c_void>());
        assert_eq!(addresses.as_slice()[2], c.as_ptr().cast::<c_void>());
    }

    #[test]
    fn absent_channel_is_null() {
        let a = vec![0u8; 4];
        let buffs = BufferSet::from_options(vec![None, Some(a.as_slice())]);
        let (addresses, _guard) = marshal(&buffs);
        assert!(addresses.as_slice()[0].is_null());
        assert_eq!(addresses.as_slice()[1], a.as_ptr().cast::<c_void>());
    }

    #[test]
    fn mutable_buffers_are_released_with_the_guard() {
        let mut a = vec![0i16; 8];
        let mut b = vec![0i16; 8];
        {
            let mut buffs = [a.as_mut_slice(), b.as_mut_slice()];
            let (addresses, guard) = marshal_mut(&mut buffs);
            assert_eq!(addresses.len(), 2);
            // Stand-in for the transport filling the buffers
            unsafe {
                *addresses.as_slice()[0].cast::<i16>() = 7;
                *addresses.as_slice()[1].cast::<i16>().add(7) = -7;
            }
            drop(guard);
        }
        a[1] = 1;
        assert_eq!(a[..2], [7, 1]);
        assert_eq!(b[7], -7);
    }

    #[test]
    fn guard_released_on_unwind() {
        let mut a = vec![0.5f64; 16];
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let buffs = BufferSet::single(a.as_slice());
            let (_addresses, _guard) = marshal(&buffs);
            panic!("transport failure");
        }));
        assert!(outcome.is_err());
        // Exclusive access again once the guard unwound
        a[0] = 1.0;
        assert_eq!(a[0], 1.0);
    }

    #[test]
    fn raw_addresses_are_passed_through() {
        let a = [1u32, 2, 3];
        let raw = [a.as_ptr().cast::<c_void>(), ptr::null()];
        let addresses = marshal_raw(&raw);
        assert_eq!(addresses.as_slice(), &raw);
    }
}
