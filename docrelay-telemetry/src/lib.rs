//! Logging and metrics setup shared by every process embedding the relay.

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
