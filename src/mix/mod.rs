// Purpose: channel strips and stream summing
// Everything after the synthesizers and before the output sink.

pub mod channel;
pub mod multiplexer;

pub use channel::{pan_gains, Channel, ChannelBuffer, Routing, PAN_CENTER};
pub use multiplexer::StreamMultiplexer;
