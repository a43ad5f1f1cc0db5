//! Applies a parsed user event to the store.
//!
//! Each event results in at most one write. Nothing is retried and a failed
//! write is not compensated.

use tracing::{info, warn};

use crate::error::WebhookError;
use crate::event::UserEvent;
use crate::store::{UserRecord, UserStore};

/// What a single event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    /// `user.updated` for a user that is not stored.
    UpdateMissed,
    Deleted,
    /// `user.deleted` for a user that is not stored.
    DeleteMissed,
    /// Event type the sync does not act on.
    Ignored,
}

/// Apply `event` to `store`.
///
/// Lookup misses on update and delete are reported as outcomes, not errors.
pub async fn apply_event(
    store: &dyn UserStore,
    event: UserEvent,
) -> Result<SyncOutcome, WebhookError> {
    let outcome = match event {
        UserEvent::Created(data) => {
            let user = UserRecord::try_from(&data)?;
            store.insert_user(&user).await?;
            info!(clerk_id = %user.clerk_id, "user_created");
            SyncOutcome::Created
        }
        UserEvent::Updated(data) => {
            let user = UserRecord::try_from(&data)?;
            if store.update_user(&user).await? {
                info!(clerk_id = %user.clerk_id, "user_updated");
                SyncOutcome::Updated
            } else {
                warn!(clerk_id = %user.clerk_id, "user_update_not_found");
                SyncOutcome::UpdateMissed
            }
        }
        UserEvent::Deleted(data) => {
            if store.delete_user(&data.id).await? {
                info!(clerk_id = %data.id, "user_deleted");
                SyncOutcome::Deleted
            } else {
                warn!(clerk_id = %data.id, "user_delete_not_found");
                SyncOutcome::DeleteMissed
            }
        }
        UserEvent::Unhandled(event_type) => {
            info!(event_type = %event_type, "event_ignored");
            SyncOutcome::Ignored
        }
    };

    Ok(outcome)
}
