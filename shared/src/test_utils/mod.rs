//! Test doubles shared by the workspace crates.

pub mod clock;
pub mod http_test_utils;
pub mod recording_transport;
pub mod test_logging;
