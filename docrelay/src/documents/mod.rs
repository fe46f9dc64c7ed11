//! Documents replicated by the relay.

mod message;
mod message_status;
mod profile;
mod service;

pub use message::{Message, processed_messages};
pub use message_status::{MessageStatus, MessageStatusValue, status_in};
pub use profile::{Profile, exclude_test_profiles};
pub use service::{Service, visible_services};
