// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use arbor_core::{Grant, GrantId, Resource};

use crate::grants::GrantStore;
use crate::memory::{MemoryError, MemoryState, MemoryStore};

impl MemoryState {
    fn grants_of(&self, ids: Option<&BTreeSet<GrantId>>) -> Vec<Grant> {
        ids.map(|ids| {
            ids.iter()
                .filter_map(|id| self.grants.get(id))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
    }

    fn index_source(&mut self, grant: &Grant) {
        if let Some(source) = grant.inherited_from() {
            self.grants_by_source
                .entry(source)
                .or_default()
                .insert(grant.id);
        }
    }

    fn unindex_source(&mut self, grant: &Grant) {
        if let Some(source) = grant.inherited_from() {
            if let Some(dependents) = self.grants_by_source.get_mut(&source) {
                dependents.remove(&grant.id);
                if dependents.is_empty() {
                    self.grants_by_source.remove(&source);
                }
            }
        }
    }
}

impl GrantStore for MemoryStore {
    type Error = MemoryError;

    async fn get_grant(&self, id: &GrantId) -> Result<Option<Grant>, Self::Error> {
        let state = self.read().await;
        Ok(state.grants.get(id).cloned())
    }

    async fn find_by_resource(&self, resource: &Resource) -> Result<Vec<Grant>, Self::Error> {
        let state = self.read().await;
        Ok(state.grants_of(state.grants_by_resource.get(resource)))
    }

    async fn find_by_inherited_from(&self, source: &GrantId) -> Result<Vec<Grant>, Self::Error> {
        let state = self.read().await;
        Ok(state.grants_of(state.grants_by_source.get(source)))
    }

    async fn insert_grant(&self, grant: &Grant) -> Result<bool, Self::Error> {
        let mut guard = self.write().await?;
        let state = &mut *guard;

        if state.grants.contains_key(&grant.id) {
            return Ok(false);
        }

        let assignee_taken = state
            .grants_by_resource
            .get(&grant.resource)
            .into_iter()
            .flatten()
            .filter_map(|id| state.grants.get(id))
            .any(|existing| existing.assignee == grant.assignee);
        if assignee_taken {
            return Ok(false);
        }

        state
            .grants_by_resource
            .entry(grant.resource)
            .or_default()
            .insert(grant.id);
        state.index_source(grant);
        state.grants.insert(grant.id, grant.clone());

        Ok(true)
    }

    async fn update_grant(&self, grant: &Grant) -> Result<bool, Self::Error> {
        let mut guard = self.write().await?;
        let state = &mut *guard;

        let Some(existing) = state.grants.get(&grant.id).cloned() else {
            return Ok(false);
        };

        state.unindex_source(&existing);
        let updated = Grant {
            level: grant.level,
            source: grant.source,
            ..existing
        };
        state.index_source(&updated);
        state.grants.insert(updated.id, updated);

        Ok(true)
    }

    async fn delete_grant(&self, id: &GrantId) -> Result<bool, Self::Error> {
        let mut guard = self.write().await?;
        let state = &mut *guard;

        let Some(grant) = state.grants.remove(id) else {
            return Ok(false);
        };

        if let Some(ids) = state.grants_by_resource.get_mut(&grant.resource) {
            ids.remove(id);
            if ids.is_empty() {
                state.grants_by_resource.remove(&grant.resource);
            }
        }
        state.unindex_source(&grant);

        Ok(true)
    }
}
