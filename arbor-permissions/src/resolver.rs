// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inheritance of grants for newly created pages.
use std::collections::BTreeSet;

use arbor_core::{Assignee, Grant, PageId, Resource, SpaceId};
use arbor_store::{GrantStore, PageStore};
use tracing::trace;

use crate::error::PermissionError;

/// Compute the inherited grants of a page about to be created under `parent_id`, or at the root
/// of `space_id` when no parent is given.
///
/// Every returned grant points at the authoritative source of the grant it was copied from, never
/// at an intermediate copy. Nothing is persisted.
pub async fn resolve_initial_grants<S, E>(
    store: &S,
    page_id: &PageId,
    parent_id: Option<PageId>,
    space_id: &SpaceId,
) -> Result<Vec<Grant>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    resolve_inherited_grants(store, page_id, parent_id, space_id, &BTreeSet::new()).await
}

/// Same as [`resolve_initial_grants`] but skips the given assignees, usually the ones the page
/// already holds local grants for.
pub async fn resolve_inherited_grants<S, E>(
    store: &S,
    page_id: &PageId,
    parent_id: Option<PageId>,
    space_id: &SpaceId,
    excluded: &BTreeSet<Assignee>,
) -> Result<Vec<Grant>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    let sources = inheritance_sources(store, parent_id, space_id).await?;
    let resource = Resource::Page(*page_id);

    let grants: Vec<Grant> = sources
        .iter()
        .filter(|grant| !excluded.contains(&grant.assignee))
        .map(|grant| Grant::inherit(resource, grant))
        .collect();

    trace!(
        page_id = %page_id,
        parent_id = ?parent_id,
        count = grants.len(),
        "resolved inherited grants"
    );

    Ok(grants)
}

/// The grants a page with the given parent inherits from: the parent's permission set, or the
/// space defaults for root pages.
pub(crate) async fn inheritance_sources<S, E>(
    store: &S,
    parent_id: Option<PageId>,
    space_id: &SpaceId,
) -> Result<Vec<Grant>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    match parent_id {
        Some(parent_id) => {
            let parent = store
                .get_page(&parent_id)
                .await
                .map_err(PermissionError::Store)?;

            match parent {
                Some(parent) if parent.space_id == *space_id => store
                    .find_by_page(&parent_id)
                    .await
                    .map_err(PermissionError::Store),
                _ => Err(PermissionError::PageNotFound(parent_id)),
            }
        }
        None => store
            .find_space_defaults(space_id)
            .await
            .map_err(PermissionError::Store),
    }
}
