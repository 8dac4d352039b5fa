use fixed::types::I64F64;
use std::ops::{BitOr, BitOrAssign};

/// Seconds as a fixed point number, precise to well below a nanosecond over any realistic epoch.
pub type Timestamp = I64F64;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Bitfield of per-operation stream flags, using the device driver's bit positions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct StreamFlags(u32);

impl StreamFlags {
    pub const NONE: StreamFlags = StreamFlags(0);
    /// The operation ends a burst of samples
    pub const END_BURST: StreamFlags = StreamFlags(1 << 1);
    /// The time value of the operation is meaningful
    pub const HAS_TIME: StreamFlags = StreamFlags(1 << 2);
    /// A burst was ended before all samples were transferred
    pub const END_ABRUPT: StreamFlags = StreamFlags(1 << 3);
    pub const ONE_PACKET: StreamFlags = StreamFlags(1 << 4);
    pub const MORE_FRAGMENTS: StreamFlags = StreamFlags(1 << 5);
    pub const WAIT_TRIGGER: StreamFlags = StreamFlags(1 << 6);

    pub const fn from_bits(bits: u32) -> StreamFlags {
        StreamFlags(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: StreamFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StreamFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for StreamFlags {
    type Output = StreamFlags;

    fn bitor(self, other: StreamFlags) -> StreamFlags {
        StreamFlags(self.0 | other.0)
    }
}

impl BitOrAssign for StreamFlags {
    fn bitor_assign(&mut self, other: StreamFlags) {
        self.insert(other);
    }
}

/// Outcome record of one transport operation. Returned for failed operations too, where
/// `num_elems` may hold a partial count.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct StreamResult {
    /// Number of elements per channel actually transferred
    pub num_elems: usize,
    pub flags: StreamFlags,
    /// Device time of the first transferred element, only meaningful with `HAS_TIME`
    pub time_ns: i64,
    /// Timeout the operation ran with
    pub timeout_us: i64,
    /// Channels the status applies to, filled by status queries
    pub chan_mask: usize,
}

impl StreamResult {
    pub fn has_time(&self) -> bool {
        self.flags.contains(StreamFlags::HAS_TIME)
    }

    /// `time_ns` in seconds. Split into whole seconds and a fraction before conversion so large
    /// epochs keep their nanoseconds.
    pub fn timestamp(&self) -> Timestamp {
        let secs = self.time_ns.div_euclid(NANOS_PER_SEC);
        let frac = self.time_ns.rem_euclid(NANOS_PER_SEC);
        Timestamp::from_num(secs) + Timestamp::from_num(frac) / Timestamp::from_num(NANOS_PER_SEC)
    }
}

#[cfg(test)]
mod result_tests {
    use super::*;

    #[test]
    fn flag_operations() {
        let mut flags = StreamFlags::END_BURST | StreamFlags::HAS_TIME;
        assert_eq!(flags.bits(), 0b110);
        assert!(flags.contains(StreamFlags::END_BURST));
        assert!(flags.contains(StreamFlags::HAS_TIME));
        assert!(!flags.contains(StreamFlags::ONE_PACKET));

        flags |= StreamFlags::ONE_PACKET;
        assert!(flags.contains(StreamFlags::ONE_PACKET | StreamFlags::END_BURST));
        assert!(StreamFlags::NONE.is_empty());
        assert_eq!(StreamFlags::from_bits(1 << 6), StreamFlags::WAIT_TRIGGER);
    }

    #[test]
    fn timestamp_small() {
        let result = StreamResult {
            time_ns: 1_500_000_000,
            ..Default::default()
        };
        assert_eq!(result.timestamp(), Timestamp::from_num(1.5));

        let result = StreamResult {
            time_ns: -500_000_000,
            ..Default::default()
        };
        assert_eq!(result.timestamp(), Timestamp::from_num(-0.5));
    }

    #[test]
    fn timestamp_keeps_nanoseconds_at_unix_epoch() {
        // 2025-09-20T13:05:03.000000001Z
        let result = StreamResult {
            time_ns: 1_758_373_503_000_000_001,
            flags: StreamFlags::HAS_TIME,
            ..Default::default()
        };
        assert!(result.has_time());
        let ts = result.timestamp();
        assert_eq!(ts.int(), Timestamp::from_num(1_758_373_503i64));
        let nanos = (ts.frac() * Timestamp::from_num(NANOS_PER_SEC)).round();
        assert_eq!(nanos, Timestamp::from_num(1));
    }
}
