//! User lifecycle events.
//!
//! Verified webhook bodies are parsed into a [`UserEvent`] before anything
//! touches the store, so missing fields surface as [`PayloadError`] instead
//! of failing halfway through a write.
//!
//! ```text
//! raw body → EventEnvelope → UserEvent → UserRecord
//! ```

pub mod types;

use thiserror::Error;

use crate::store::UserRecord;

pub use types::{
    DeletedUser, EmailAddress, EventEnvelope, UserData, USER_CREATED, USER_DELETED, USER_UPDATED,
};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid event envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("invalid data for {event_type}: {source}")]
    Data {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("user {0} has no email addresses")]
    NoEmailAddress(String),
}

/// A parsed event, tagged by what it asks the store to do.
#[derive(Debug, Clone)]
pub enum UserEvent {
    Created(UserData),
    Updated(UserData),
    Deleted(DeletedUser),
    /// Any event type the sync does not act on.
    Unhandled(String),
}

impl UserEvent {
    /// Parse a verified webhook body.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let envelope: EventEnvelope =
            serde_json::from_slice(body).map_err(PayloadError::Envelope)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: EventEnvelope) -> Result<Self, PayloadError> {
        let EventEnvelope { event_type, data } = envelope;

        let event = match event_type.as_str() {
            USER_CREATED => UserEvent::Created(parse_data(&event_type, data)?),
            USER_UPDATED => UserEvent::Updated(parse_data(&event_type, data)?),
            USER_DELETED => UserEvent::Deleted(parse_data(&event_type, data)?),
            _ => UserEvent::Unhandled(event_type),
        };

        Ok(event)
    }

    /// Event type tag as Clerk names it.
    pub fn event_type(&self) -> &str {
        match self {
            UserEvent::Created(_) => USER_CREATED,
            UserEvent::Updated(_) => USER_UPDATED,
            UserEvent::Deleted(_) => USER_DELETED,
            UserEvent::Unhandled(other) => other,
        }
    }
}

fn parse_data<T: serde::de::DeserializeOwned>(
    event_type: &str,
    data: serde_json::Value,
) -> Result<T, PayloadError> {
    serde_json::from_value(data).map_err(|source| PayloadError::Data {
        event_type: event_type.to_string(),
        source,
    })
}

impl TryFrom<&UserData> for UserRecord {
    type Error = PayloadError;

    /// Map a Clerk user onto the stored record.
    ///
    /// The first listed email address wins. The display name joins first and
    /// last name with absent parts treated as empty, then trims.
    fn try_from(data: &UserData) -> Result<Self, Self::Error> {
        let email = data
            .email_addresses
            .first()
            .map(|e| e.email_address.clone())
            .ok_or_else(|| PayloadError::NoEmailAddress(data.id.clone()))?;

        Ok(UserRecord {
            clerk_id: data.id.clone(),
            email,
            name: display_name(data.first_name.as_deref(), data.last_name.as_deref()),
            image: data.image_url.clone().unwrap_or_default(),
        })
    }
}

pub fn display_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
        .trim()
        .to_string()
}
