// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::error::Error;

use arbor_core::{Grant, GrantId, PageId, Resource, SpaceId};

/// Interface for storing, deleting and querying permission grants.
///
/// Implementations enforce two constraints: grant ids are unique, and a resource holds at most
/// one grant per assignee. Back-references of inherited grants are stored as they are, dangling
/// ones are not rejected or cleaned up.
pub trait GrantStore {
    type Error: Error;

    /// Get a grant by id.
    fn get_grant(&self, id: &GrantId) -> impl Future<Output = Result<Option<Grant>, Self::Error>>;

    /// All grants decorating a resource.
    fn find_by_resource(
        &self,
        resource: &Resource,
    ) -> impl Future<Output = Result<Vec<Grant>, Self::Error>>;

    /// Permission set of a page.
    fn find_by_page(&self, id: &PageId) -> impl Future<Output = Result<Vec<Grant>, Self::Error>> {
        async move { self.find_by_resource(&Resource::Page(*id)).await }
    }

    /// Default permissions of a space.
    fn find_space_defaults(
        &self,
        id: &SpaceId,
    ) -> impl Future<Output = Result<Vec<Grant>, Self::Error>> {
        async move { self.find_by_resource(&Resource::SpaceDefaults(*id)).await }
    }

    /// Permission sets of many pages at once. Pages without grants map to an empty list.
    fn find_by_pages(
        &self,
        ids: &[PageId],
    ) -> impl Future<Output = Result<HashMap<PageId, Vec<Grant>>, Self::Error>> {
        async move {
            let mut result = HashMap::with_capacity(ids.len());
            for id in ids {
                result.insert(*id, self.find_by_page(id).await?);
            }
            Ok(result)
        }
    }

    /// All grants whose back-reference points at the given source grant.
    fn find_by_inherited_from(
        &self,
        source: &GrantId,
    ) -> impl Future<Output = Result<Vec<Grant>, Self::Error>>;

    /// Insert a grant.
    ///
    /// Returns `true` when the insert occurred, or `false` when a grant with the same id, or a
    /// grant for the same assignee on the same resource, already existed.
    fn insert_grant(&self, grant: &Grant) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Overwrite level and source of a stored grant. Resource and assignee never change.
    ///
    /// Returns `false` when the grant was not found.
    fn update_grant(&self, grant: &Grant) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Delete a grant. Grants inheriting from it are left untouched.
    ///
    /// Returns `true` when the removal occurred and `false` when the grant was not found.
    fn delete_grant(&self, id: &GrantId) -> impl Future<Output = Result<bool, Self::Error>>;
}
