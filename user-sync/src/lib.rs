//! User Sync - keeps a local user table in step with Clerk.
//!
//! Clerk posts user lifecycle webhooks (signed through Svix) to a single
//! endpoint. Each verified event becomes one write against the user store.
//!
//! ## Flow
//!
//! ```text
//! Clerk → POST /api/clerk → verify signature → UserEvent → UserStore
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod store;
pub mod sync;
pub mod web;

// Re-export commonly used types
pub use config::{Config, SigningSecret};
pub use error::WebhookError;
pub use event::{PayloadError, UserEvent};
pub use store::{SqliteUserStore, StoreError, UserRecord, UserStore};
pub use sync::{apply_event, SyncOutcome};
pub use web::{router, AppState};
