// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use arbor_core::{Page, PageId, SpaceId};

/// Interface for storing and querying the page tree of all spaces.
///
/// The store does not validate the tree, checks like "parent lives in the same space" or "no
/// cycles" are the responsibility of the caller.
pub trait PageStore {
    type Error: Error;

    /// Insert a page.
    ///
    /// Returns `true` when the insert occurred, or `false` when a page with the same id already
    /// existed and no insertion occurred.
    fn insert_page(&self, page: &Page) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Get a page by id.
    fn get_page(&self, id: &PageId) -> impl Future<Output = Result<Option<Page>, Self::Error>>;

    /// Parent of a page, `None` for root pages and unknown pages.
    fn get_parent(
        &self,
        id: &PageId,
    ) -> impl Future<Output = Result<Option<PageId>, Self::Error>> {
        async move { Ok(self.get_page(id).await?.and_then(|page| page.parent_id)) }
    }

    /// Space of a page, `None` for unknown pages.
    fn get_space_id(
        &self,
        id: &PageId,
    ) -> impl Future<Output = Result<Option<SpaceId>, Self::Error>> {
        async move { Ok(self.get_page(id).await?.map(|page| page.space_id)) }
    }

    /// Direct children of a page.
    fn get_children(&self, id: &PageId) -> impl Future<Output = Result<Vec<PageId>, Self::Error>>;

    /// Re-assign the parent of a page.
    ///
    /// Returns `false` when the page was not found.
    fn set_parent(
        &self,
        id: &PageId,
        parent_id: Option<PageId>,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Delete a single page, children are left untouched.
    ///
    /// Returns `true` when the removal occurred and `false` when the page was not found.
    fn delete_page(&self, id: &PageId) -> impl Future<Output = Result<bool, Self::Error>>;

    /// All pages of a space.
    fn list_pages(&self, space_id: &SpaceId)
    -> impl Future<Output = Result<Vec<Page>, Self::Error>>;
}
