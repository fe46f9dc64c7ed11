mod base;
mod broker;
mod cache;
mod connection;
mod fallback;
mod pipeline;
mod relay;
mod tokenizer;
mod tracker;

pub use base::*;
pub use broker::*;
pub use cache::*;
pub use connection::*;
pub use fallback::*;
pub use pipeline::*;
pub use relay::*;
pub use tokenizer::*;
pub use tracker::*;
