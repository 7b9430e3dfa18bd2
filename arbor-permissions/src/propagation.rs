// SPDX-License-Identifier: MIT OR Apache-2.0

//! Propagation of changed source grants to their dependents.
//!
//! Because inherited grants always point at their authoritative source, the dependents of a grant
//! are found with a single back-reference lookup, no matter how deep they sit in the page tree.
use std::collections::BTreeSet;

use arbor_core::{Grant, GrantId, PageId};
use arbor_store::GrantStore;
use tracing::{debug, warn};

use crate::error::PermissionError;

/// Kind of change applied to a source grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The level of the source grant changed.
    Updated,

    /// The source grant was (or is about to be) removed.
    Deleted,
}

/// Apply the change of a source grant to every grant inheriting from it.
///
/// Returns the pages whose permission sets were touched. Must run inside the caller's
/// transaction.
pub async fn propagate_grant_change<S, E>(
    store: &S,
    source_id: &GrantId,
    change: ChangeKind,
) -> Result<BTreeSet<PageId>, PermissionError<E>>
where
    S: GrantStore<Error = E>,
{
    let affected = match change {
        ChangeKind::Updated => propagate_update(store, source_id).await?,
        ChangeKind::Deleted => propagate_delete(store, source_id).await?,
    };

    debug!(
        source_id = %source_id,
        ?change,
        pages = affected.len(),
        "propagated grant change"
    );

    Ok(affected)
}

async fn propagate_update<S, E>(
    store: &S,
    source_id: &GrantId,
) -> Result<BTreeSet<PageId>, PermissionError<E>>
where
    S: GrantStore<Error = E>,
{
    let source = store
        .get_grant(source_id)
        .await
        .map_err(PermissionError::Store)?
        .ok_or(PermissionError::GrantNotFound(*source_id))?;

    let dependents = store
        .find_by_inherited_from(source_id)
        .await
        .map_err(PermissionError::Store)?;

    let mut affected = BTreeSet::new();
    for dependent in dependents {
        if dependent.level != source.level {
            let updated = Grant {
                level: source.level,
                ..dependent.clone()
            };
            store
                .update_grant(&updated)
                .await
                .map_err(PermissionError::Store)?;
        }

        if let Some(page_id) = dependent.page_id() {
            affected.insert(page_id);
        }
    }

    Ok(affected)
}

async fn propagate_delete<S, E>(
    store: &S,
    source_id: &GrantId,
) -> Result<BTreeSet<PageId>, PermissionError<E>>
where
    S: GrantStore<Error = E>,
{
    let mut affected = BTreeSet::new();
    let mut pending = vec![(*source_id, true)];

    while let Some((grant_id, is_source)) = pending.pop() {
        let dependents = store
            .find_by_inherited_from(&grant_id)
            .await
            .map_err(PermissionError::Store)?;

        if !is_source && !dependents.is_empty() {
            warn!(
                grant_id = %grant_id,
                count = dependents.len(),
                "found grants inheriting from an inherited grant, removing chain"
            );
        }

        for dependent in dependents {
            store
                .delete_grant(&dependent.id)
                .await
                .map_err(PermissionError::Store)?;

            if let Some(page_id) = dependent.page_id() {
                affected.insert(page_id);
            }

            pending.push((dependent.id, false));
        }
    }

    Ok(affected)
}
