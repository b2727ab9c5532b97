use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod auth;
pub mod health;
pub mod round;

/// RFC 3339 rendering used by every timestamp field on the wire.
fn format_system_time(time: SystemTime) -> String {
    match OffsetDateTime::from(time).format(&Rfc3339) {
        Ok(formatted) => formatted,
        Err(_) => "invalid-timestamp".into(),
    }
}
