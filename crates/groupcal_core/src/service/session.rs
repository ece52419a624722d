//! Authenticated caller context.

use crate::model::UserId;

/// Identity of the authenticated caller.
///
/// Issued by the external authentication layer and passed into every engine
/// call; request payloads never carry the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Session {
    user_id: UserId,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
