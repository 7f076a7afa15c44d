//! Resource ownership rule for handlers that mutate a user's data

use crate::auth::models::Claims;

/// An actor may act on a resource it owns, or on any resource as an admin.
pub fn may_act(actor: &Claims, owner_id: i64) -> bool {
    actor.is_admin() || actor.user_id() == Some(owner_id)
}
