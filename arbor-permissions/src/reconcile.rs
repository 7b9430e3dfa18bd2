// SPDX-License-Identifier: MIT OR Apache-2.0

//! Re-deriving inherited grants of a whole subtree.
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use arbor_core::{Assignee, Grant, GrantSource, PageId, Resource};
use arbor_store::{GrantStore, PageStore};
use tracing::{debug, trace};

use crate::error::PermissionError;
use crate::resolver::inheritance_sources;

/// Re-derive the inherited grants of `root_id` and all of its descendants from their parents, or
/// from the space defaults for root pages.
///
/// Pages are visited top-down so every page sees the already reconciled set of its parent. Local
/// grants are never touched and shadow inherited grants for the same assignee. Returns the pages
/// whose permission sets changed.
pub async fn reconcile_subtree<S, E>(
    store: &S,
    root_id: &PageId,
) -> Result<BTreeSet<PageId>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    reconcile(store, root_id, None).await
}

/// Re-derive only the inherited grants for `assignee` in the subtree of `root_id`.
///
/// Used after a new local grant was placed on `root_id` or a new space default was added. Grants
/// of all other assignees are left alone, also where they differ from what the parent would hand
/// down after a source was deleted further up.
pub async fn reconcile_subtree_for<S, E>(
    store: &S,
    root_id: &PageId,
    assignee: &Assignee,
) -> Result<BTreeSet<PageId>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    reconcile(store, root_id, Some(assignee)).await
}

async fn reconcile<S, E>(
    store: &S,
    root_id: &PageId,
    scope: Option<&Assignee>,
) -> Result<BTreeSet<PageId>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    let mut affected = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([*root_id]);

    while let Some(page_id) = queue.pop_front() {
        if !visited.insert(page_id) {
            continue;
        }

        if reconcile_page(store, &page_id, scope).await? {
            affected.insert(page_id);
        }

        let children = store
            .get_children(&page_id)
            .await
            .map_err(PermissionError::Store)?;
        queue.extend(children);
    }

    debug!(
        root_id = %root_id,
        assignee = ?scope,
        visited = visited.len(),
        changed = affected.len(),
        "reconciled subtree"
    );

    Ok(affected)
}

/// Reconcile the inherited grants of a single page, returns `true` if anything changed.
///
/// With a `scope` only grants of that assignee are looked at.
async fn reconcile_page<S, E>(
    store: &S,
    page_id: &PageId,
    scope: Option<&Assignee>,
) -> Result<bool, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    let page = store
        .get_page(page_id)
        .await
        .map_err(PermissionError::Store)?
        .ok_or(PermissionError::PageNotFound(*page_id))?;

    let in_scope = |grant: &Grant| scope.is_none_or(|assignee| grant.assignee == *assignee);

    let sources: Vec<Grant> = inheritance_sources(store, page.parent_id, &page.space_id)
        .await?
        .into_iter()
        .filter(in_scope)
        .collect();
    let current: Vec<Grant> = store
        .find_by_page(page_id)
        .await
        .map_err(PermissionError::Store)?
        .into_iter()
        .filter(in_scope)
        .collect();

    let local: BTreeSet<Assignee> = current
        .iter()
        .filter(|grant| grant.is_local())
        .map(|grant| grant.assignee)
        .collect();

    let mut desired: BTreeMap<Assignee, &Grant> = sources
        .iter()
        .filter(|grant| !local.contains(&grant.assignee))
        .map(|grant| (grant.assignee, grant))
        .collect();

    let mut changed = false;

    for grant in current.iter().filter(|grant| !grant.is_local()) {
        match desired.remove(&grant.assignee) {
            Some(source) => {
                let source_id = GrantSource::Inherited(source.origin());
                if grant.source != source_id || grant.level != source.level {
                    let updated = Grant {
                        level: source.level,
                        source: source_id,
                        ..grant.clone()
                    };
                    store
                        .update_grant(&updated)
                        .await
                        .map_err(PermissionError::Store)?;
                    changed = true;
                }
            }
            None => {
                trace!(grant_id = %grant.id, page_id = %page_id, "remove stale inherited grant");
                store
                    .delete_grant(&grant.id)
                    .await
                    .map_err(PermissionError::Store)?;
                changed = true;
            }
        }
    }

    for source in desired.into_values() {
        let grant = Grant::inherit(Resource::Page(*page_id), source);
        let inserted = store
            .insert_grant(&grant)
            .await
            .map_err(PermissionError::Store)?;
        if !inserted {
            return Err(PermissionError::Consistency(format!(
                "page {page_id} already holds a grant for {}",
                grant.assignee
            )));
        }
        changed = true;
    }

    Ok(changed)
}
