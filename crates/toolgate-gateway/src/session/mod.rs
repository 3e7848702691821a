//! Channels and the session registry

mod channel;
mod registry;

pub use channel::{
    byte_stream_channel, stdio_channel, ChannelCloser, ChannelError, ChannelIo,
    InboundStream, OutboundSink, SseChannel, DEFAULT_CHANNEL_BUFFER,
};
pub use registry::{Session, SessionRegistry};
