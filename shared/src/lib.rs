//! Domain library for the coffee-break coordinator: data model, store
//! contracts, settings, chat transport, and consumption statistics.

pub mod clock;
pub mod models;
pub mod settings;
pub mod stats;
pub mod store;
pub mod transport;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
