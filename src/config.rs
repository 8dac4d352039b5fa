use crate::format::{FormatTag, Sample};
use crate::transport::StreamArgs;

/// Everything the transport needs to set up a stream.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamConfig {
    pub format: FormatTag,
    /// Device channel indices, in the order buffers are passed
    pub channels: Vec<usize>,
    pub args: StreamArgs,
}

impl StreamConfig {
    /// A single-channel configuration on channel 0
    pub fn new(format: FormatTag) -> StreamConfig {
        StreamConfig {
            format,
            channels: vec![0],
            args: StreamArgs::new(),
        }
    }

    pub fn for_sample<T: Sample>() -> StreamConfig {
        StreamConfig::new(T::FORMAT)
    }

    /// An empty list falls back to channel 0, as device drivers do.
    pub fn channels(mut self, channels: impl Into<Vec<usize>>) -> StreamConfig {
        self.channels = channels.into();
        if self.channels.is_empty() {
            self.channels.push(0);
        }
        self
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> StreamConfig {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn args(mut self, args: StreamArgs) -> StreamConfig {
        self.args.extend(args);
        self
    }
}
