//! Groups and per-(group, user) memberships.
//!
//! Membership lifecycle:
//! none -> pending (join request) -> accepted (representative decision)
//! -> none (self-leave or removal). A pending request may also be rejected
//! back to none. Representatives toggle the representative flag of accepted
//! members.

use crate::model::{normalize_required, GroupId, UserId, ValidationError};
use serde::{Deserialize, Serialize};

pub(crate) const GROUP_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: GroupId,
    /// Display name; also the confirmation token for join requests.
    pub name: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Normalizes a group display name.
pub fn normalize_group_name(name: &str) -> Result<String, ValidationError> {
    normalize_required("name", name, GROUP_NAME_MAX_CHARS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: GroupId,
    pub user_id: UserId,
    /// `false` means a pending join request.
    pub accepted: bool,
    /// Group administrator role; only meaningful when accepted.
    pub is_representative: bool,
    /// Epoch milliseconds of the request or direct creation.
    pub joined_at: i64,
}

impl Membership {
    pub fn status(&self) -> MembershipStatus {
        if self.accepted {
            MembershipStatus::Accepted
        } else {
            MembershipStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.accepted
    }
}

/// A group together with the caller's own membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub group: Group,
    pub my_membership: Membership,
}

#[cfg(test)]
mod tests {
    use super::normalize_group_name;
    use crate::model::ValidationError;

    #[test]
    fn group_name_is_trimmed_and_bounded() {
        assert_eq!(
            normalize_group_name("  Tennis club ").expect("valid name"),
            "Tennis club"
        );
        assert_eq!(
            normalize_group_name(&"x".repeat(101)).expect_err("too long"),
            ValidationError::TooLong {
                field: "name",
                max_chars: 100
            }
        );
    }
}
