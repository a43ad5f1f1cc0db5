//! Wire types for Clerk user webhooks.
//!
//! Clerk wraps every event as `{"type": "...", "data": {...}, ...}`. Only the
//! fields the sync needs are modelled; everything else is ignored.

use serde::Deserialize;

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// Outer event envelope, with `data` left untyped until the tag is known.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

/// User object carried by `user.created` and `user.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    /// Clerk user id
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

/// Object carried by `user.deleted`.
///
/// Clerk only sends `{"id": ..., "deleted": true, "object": "user"}` here.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletedUser {
    pub id: String,
}
