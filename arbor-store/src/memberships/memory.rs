// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::{SpaceId, SpaceMembership, UserId};

use crate::memberships::MembershipStore;
use crate::memory::{MemoryError, MemoryStore};

impl MembershipStore for MemoryStore {
    type Error = MemoryError;

    async fn membership(
        &self,
        user_id: &UserId,
        space_id: &SpaceId,
    ) -> Result<Option<SpaceMembership>, Self::Error> {
        let state = self.read().await;
        Ok(state.memberships.get(&(*user_id, *space_id)).cloned())
    }

    async fn set_membership(&self, membership: &SpaceMembership) -> Result<bool, Self::Error> {
        let mut state = self.write().await?;
        let previous = state
            .memberships
            .insert((membership.user_id, membership.space_id), membership.clone());
        Ok(previous.is_none())
    }

    async fn remove_membership(
        &self,
        user_id: &UserId,
        space_id: &SpaceId,
    ) -> Result<bool, Self::Error> {
        let mut state = self.write().await?;
        Ok(state
            .memberships
            .remove(&(*user_id, *space_id))
            .is_some())
    }
}
