//! Test doubles shared by unit tests and downstream integration tests.

mod clock;
mod status;

pub use clock::ManualTimeProvider;
pub use status::RecordingStatusPort;
