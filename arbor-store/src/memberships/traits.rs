// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use arbor_core::{SpaceId, SpaceMembership, UserId};

/// Interface for storing users' memberships in spaces, including their admin flag and roles.
pub trait MembershipStore {
    type Error: Error;

    /// Get the membership of a user in a space.
    fn membership(
        &self,
        user_id: &UserId,
        space_id: &SpaceId,
    ) -> impl Future<Output = Result<Option<SpaceMembership>, Self::Error>>;

    /// Insert or replace a membership.
    ///
    /// Returns `true` when the user was not a member of the space before.
    fn set_membership(
        &self,
        membership: &SpaceMembership,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Remove a user from a space.
    ///
    /// Returns `true` when the removal occurred and `false` when the user was not a member.
    fn remove_membership(
        &self,
        user_id: &UserId,
        space_id: &SpaceId,
    ) -> impl Future<Output = Result<bool, Self::Error>>;
}
