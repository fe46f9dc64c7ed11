use serde_json::json;

use crate::documents::{Message, MessageStatus, MessageStatusValue, Profile, Service};
use crate::types::RawDocument;

pub fn profile(fiscal_code: &str, version: u64) -> Profile {
    Profile {
        fiscal_code: fiscal_code.to_string(),
        email: Some(format!("{}@example.com", fiscal_code.to_lowercase())),
        is_email_enabled: true,
        version,
        tokenized_fiscal_code: None,
    }
}

/// The raw payload of [`profile`].
pub fn raw_profile(fiscal_code: &str, version: u64) -> RawDocument {
    json!({
        "fiscal_code": fiscal_code,
        "email": format!("{}@example.com", fiscal_code.to_lowercase()),
        "is_email_enabled": true,
        "version": version
    })
}

/// Raw profiles with distinct fiscal codes, versioned 0.
pub fn raw_profiles(count: usize) -> Vec<RawDocument> {
    (0..count)
        .map(|i| raw_profile(&format!("PRFL{i:012}"), 0))
        .collect()
}

pub fn message(id: &str, fiscal_code: &str) -> Message {
    Message {
        id: id.to_string(),
        fiscal_code: fiscal_code.to_string(),
        sender_service_id: "service-1".to_string(),
        is_pending: false,
        content: None,
        tokenized_fiscal_code: None,
    }
}

pub fn message_status(message_id: &str, status: MessageStatusValue, version: u64) -> MessageStatus {
    MessageStatus {
        message_id: message_id.to_string(),
        status,
        version,
        fiscal_code: "AAAAAA00A00A000A".to_string(),
        is_read: false,
        is_archived: false,
    }
}

pub fn raw_service(service_id: &str, version: u64) -> RawDocument {
    json!({
        "service_id": service_id,
        "service_name": format!("Service {service_id}"),
        "organization_fiscal_code": "01234567891",
        "version": version,
        "is_visible": true
    })
}

pub fn service(service_id: &str, version: u64) -> Service {
    Service {
        service_id: service_id.to_string(),
        service_name: format!("Service {service_id}"),
        organization_fiscal_code: "01234567891".to_string(),
        version,
        is_visible: true,
    }
}
