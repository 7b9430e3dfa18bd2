// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::{Page, PageId, SpaceId};

use crate::memory::{MemoryError, MemoryState, MemoryStore};
use crate::pages::PageStore;

impl MemoryState {
    fn index_child(&mut self, parent_id: PageId, id: PageId) {
        self.children.entry(parent_id).or_default().insert(id);
    }

    fn unindex_child(&mut self, parent_id: &PageId, id: &PageId) {
        if let Some(children) = self.children.get_mut(parent_id) {
            children.remove(id);
            if children.is_empty() {
                self.children.remove(parent_id);
            }
        }
    }
}

impl PageStore for MemoryStore {
    type Error = MemoryError;

    async fn insert_page(&self, page: &Page) -> Result<bool, Self::Error> {
        let mut state = self.write().await?;

        if state.pages.contains_key(&page.id) {
            return Ok(false);
        }

        state.pages.insert(page.id, *page);
        if let Some(parent_id) = page.parent_id {
            state.index_child(parent_id, page.id);
        }

        Ok(true)
    }

    async fn get_page(&self, id: &PageId) -> Result<Option<Page>, Self::Error> {
        let state = self.read().await;
        Ok(state.pages.get(id).copied())
    }

    async fn get_children(&self, id: &PageId) -> Result<Vec<PageId>, Self::Error> {
        let state = self.read().await;
        Ok(state
            .children
            .get(id)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn set_parent(
        &self,
        id: &PageId,
        parent_id: Option<PageId>,
    ) -> Result<bool, Self::Error> {
        let mut state = self.write().await?;

        let Some(page) = state.pages.get_mut(id) else {
            return Ok(false);
        };

        let previous = std::mem::replace(&mut page.parent_id, parent_id);
        if let Some(previous) = previous {
            state.unindex_child(&previous, id);
        }
        if let Some(parent_id) = parent_id {
            state.index_child(parent_id, *id);
        }

        Ok(true)
    }

    async fn delete_page(&self, id: &PageId) -> Result<bool, Self::Error> {
        let mut state = self.write().await?;

        let Some(page) = state.pages.remove(id) else {
            return Ok(false);
        };

        if let Some(parent_id) = page.parent_id {
            state.unindex_child(&parent_id, id);
        }
        // Children left behind are orphans now, they don't show up under a re-used id.
        state.children.remove(id);

        Ok(true)
    }

    async fn list_pages(&self, space_id: &SpaceId) -> Result<Vec<Page>, Self::Error> {
        let state = self.read().await;
        let mut pages: Vec<Page> = state
            .pages
            .values()
            .filter(|page| page.space_id == *space_id)
            .copied()
            .collect();
        pages.sort_by_key(|page| page.id);
        Ok(pages)
    }
}
