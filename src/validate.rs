//! Checks a multi-channel buffer set against the layout a stream was set up with.
//!
//! Checks run in a fixed order and stop at the first violation: absent set, channel count,
//! element format, absent channel buffer, uneven lengths. Nothing is mutated.

use crate::error::StreamError;
use crate::format::{FormatTag, format_tag_of};
use std::collections::BTreeSet;

/// One buffer per stream channel, in channel order. Entries may be absent so that a partially
/// filled set can be represented and rejected by [`validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct BufferSet<'a, T> {
    channels: Vec<Option<&'a [T]>>,
}

impl<'a, T> BufferSet<'a, T> {
    pub fn new(channels: &[&'a [T]]) -> Self {
        BufferSet {
            channels: channels.iter().map(|c| Some(*c)).collect(),
        }
    }

    pub fn from_options(channels: Vec<Option<&'a [T]>>) -> Self {
        BufferSet { channels }
    }

    pub fn single(channel: &'a [T]) -> Self {
        BufferSet {
            channels: vec![Some(channel)],
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> &[Option<&'a [T]>] {
        &self.channels
    }

    /// Element count of the first channel, which is the count of every channel once validated
    pub fn num_elems(&self) -> usize {
        self.channels.first().copied().flatten().map_or(0, <[T]>::len)
    }
}

impl<'a, T> From<&'a [Vec<T>]> for BufferSet<'a, T> {
    fn from(buffs: &'a [Vec<T>]) -> Self {
        BufferSet {
            channels: buffs.iter().map(|b| Some(b.as_slice())).collect(),
        }
    }
}

/// Validates `buffs` for a stream of `format` carrying `num_channels` channels.
pub fn validate<T: 'static>(
    format: FormatTag,
    num_channels: usize,
    buffs: Option<&BufferSet<'_, T>>,
) -> Result<(), StreamError> {
    let buffs = buffs.ok_or(StreamError::NullBufferSet)?;
    check_layout::<T>(
        format,
        num_channels,
        buffs.channels().iter().map(|c| c.map(<[T]>::len)),
    )
}

/// Same checks as [`validate`] for the mutable buffers a receive call fills.
pub fn validate_mut<T: 'static>(
    format: FormatTag,
    num_channels: usize,
    buffs: &[&mut [T]],
) -> Result<(), StreamError> {
    check_layout::<T>(format, num_channels, buffs.iter().map(|b| Some(b.len())))
}

fn check_layout<T: 'static>(
    format: FormatTag,
    num_channels: usize,
    lengths: impl ExactSizeIterator<Item = Option<usize>>,
) -> Result<(), StreamError> {
    if lengths.len() != num_channels {
        return Err(StreamError::ChannelCountMismatch {
            expected: num_channels,
            found: lengths.len(),
        });
    }

    let found = format_tag_of::<T>()?;
    if found != format {
        return Err(StreamError::FormatMismatch {
            expected: format,
            found,
        });
    }

    let mut unique_lengths = BTreeSet::new();
    for (index, length) in lengths.enumerate() {
        let length = length.ok_or(StreamError::NullChannelBuffer(index))?;
        unique_lengths.insert(length);
    }

    if unique_lengths.len() > 1 {
        return Err(StreamError::UnevenChannelLengths(
            unique_lengths.into_iter().collect(),
        ));
    }

    Ok(())
}
