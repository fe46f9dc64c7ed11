//! Concurrency primitives of the relay.
//!
//! Every fan-out in the relay goes through [`run_bounded`], which is the single place where
//! concurrent work is created. Work is split in chunks that run one after the other, so the
//! number of in-flight external calls of a stage never exceeds its configured chunk size.

mod bounded;

pub use bounded::run_bounded;
