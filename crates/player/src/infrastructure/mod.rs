pub mod platform;
pub mod status;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use status::{ChannelStatusPort, TracingStatusPort};
