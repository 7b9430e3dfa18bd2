// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

use crate::identity::{PageId, SpaceId};

/// A node in a space's page tree.
///
/// Boards and cards are pages as well. A page without a parent is a root page of its space.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub space_id: SpaceId,
    pub parent_id: Option<PageId>,
}

impl Page {
    pub fn new(id: PageId, space_id: SpaceId, parent_id: Option<PageId>) -> Self {
        Self {
            id,
            space_id,
            parent_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
