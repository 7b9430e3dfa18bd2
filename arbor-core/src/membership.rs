// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::assignee::Assignee;
use crate::identity::{RoleId, SpaceId, UserId};

/// A user's membership in a space.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SpaceMembership {
    pub user_id: UserId,
    pub space_id: SpaceId,
    pub is_admin: bool,
    pub roles: BTreeSet<RoleId>,
}

impl SpaceMembership {
    pub fn new(user_id: UserId, space_id: SpaceId) -> Self {
        Self {
            user_id,
            space_id,
            is_admin: false,
            roles: BTreeSet::new(),
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn with_role(mut self, role_id: RoleId) -> Self {
        self.roles.insert(role_id);
        self
    }

    /// Returns true if a grant to this assignee applies to the member.
    pub fn matches(&self, assignee: &Assignee) -> bool {
        match assignee {
            Assignee::User(user_id) => *user_id == self.user_id,
            Assignee::Role(role_id) => self.roles.contains(role_id),
            Assignee::Space(space_id) => *space_id == self.space_id,
            Assignee::Public => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Assignee, RoleId, SpaceId, UserId};

    use super::SpaceMembership;

    #[test]
    fn matching_assignees() {
        let user_id = UserId::random();
        let space_id = SpaceId::random();
        let role_id = RoleId::random();
        let member = SpaceMembership::new(user_id, space_id).with_role(role_id);

        assert!(member.matches(&Assignee::User(user_id)));
        assert!(member.matches(&Assignee::Role(role_id)));
        assert!(member.matches(&Assignee::Space(space_id)));
        assert!(member.matches(&Assignee::Public));

        assert!(!member.matches(&Assignee::User(UserId::random())));
        assert!(!member.matches(&Assignee::Role(RoleId::random())));
        assert!(!member.matches(&Assignee::Space(SpaceId::random())));
    }
}
