// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeSet, HashMap, VecDeque};

use arbor_core::{
    Assignee, Grant, GrantId, Page, PageId, PageOperations, PermissionLevel, Resource, SpaceId,
    SpaceMembership, UserId,
};
use arbor_store::{GrantStore, MembershipStore, PageStore, Transaction};
use tracing::{debug, warn};

use crate::audit::{self, Violation};
use crate::compute;
use crate::config::Config;
use crate::error::PermissionError;
use crate::propagation::{ChangeKind, propagate_grant_change};
use crate::reconcile::{reconcile_subtree, reconcile_subtree_for};
use crate::resolver::resolve_initial_grants;

/// A page to be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewPage {
    pub id: PageId,
    pub space_id: SpaceId,
    pub parent_id: Option<PageId>,
}

impl NewPage {
    /// Page at the top level of a space, inheriting the space defaults.
    pub fn root(space_id: SpaceId) -> Self {
        Self {
            id: PageId::random(),
            space_id,
            parent_id: None,
        }
    }

    /// Page nested under `parent`.
    pub fn child_of(parent: &Page) -> Self {
        Self {
            id: PageId::random(),
            space_id: parent.space_id,
            parent_id: Some(parent.id),
        }
    }
}

/// Permission engine over a store.
///
/// Every mutating method runs as one store transaction: either all of its writes become visible
/// or, on any error, none of them. Transactions of one store are serialized, so two operations
/// on overlapping subtrees never interleave. Reads outside of these transactions only see
/// committed state.
#[derive(Clone, Debug)]
pub struct Permissions<S> {
    store: S,
    config: Config,
}

impl<S, E> Permissions<S>
where
    S: PageStore<Error = E>
        + GrantStore<Error = E>
        + MembershipStore<Error = E>
        + Transaction<Error = E>,
{
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `f` with a transactional handle on the store, committing on success and rolling back
    /// on error.
    async fn transaction<R, F>(&self, f: F) -> Result<R, PermissionError<E>>
    where
        F: AsyncFnOnce(&S) -> Result<R, PermissionError<E>>,
    {
        let permit = self.store.begin().await.map_err(PermissionError::Store)?;
        let tx = self.store.transactional();

        match f(&tx).await {
            Ok(result) => {
                self.store
                    .commit(permit)
                    .await
                    .map_err(PermissionError::Store)?;
                Ok(result)
            }
            Err(err) => {
                if self.store.rollback(permit).await.is_err() {
                    warn!("failed rolling back transaction");
                }
                Err(err)
            }
        }
    }

    // Pages
    // ~~~~~

    /// Create a page and materialise the grants it inherits from its parent, or from the space
    /// defaults when it has no parent.
    pub async fn create_page(&self, new_page: NewPage) -> Result<Page, PermissionError<E>> {
        self.transaction(async |store| {
            let exists = store
                .get_page(&new_page.id)
                .await
                .map_err(PermissionError::Store)?
                .is_some();
            if exists {
                return Err(PermissionError::InvalidState(format!(
                    "page {} already exists",
                    new_page.id
                )));
            }

            let grants = resolve_initial_grants(
                store,
                &new_page.id,
                new_page.parent_id,
                &new_page.space_id,
            )
            .await?;

            let page = Page::new(new_page.id, new_page.space_id, new_page.parent_id);
            let inserted = store
                .insert_page(&page)
                .await
                .map_err(PermissionError::Store)?;
            if !inserted {
                return Err(PermissionError::InvalidState(format!(
                    "page {} already exists",
                    page.id
                )));
            }
            for grant in &grants {
                let inserted = store
                    .insert_grant(grant)
                    .await
                    .map_err(PermissionError::Store)?;
                if !inserted {
                    return Err(PermissionError::Consistency(format!(
                        "page {} already holds a grant for {}",
                        page.id, grant.assignee
                    )));
                }
            }

            debug!(
                page_id = %page.id,
                parent_id = ?page.parent_id,
                grants = grants.len(),
                "created page"
            );

            Ok(page)
        })
        .await
    }

    /// Attach a page to a new parent within its space, or detach it to the top level, and
    /// re-derive the inherited grants of the moved subtree.
    ///
    /// Returns the pages whose permission sets changed.
    pub async fn move_page(
        &self,
        page_id: &PageId,
        new_parent_id: Option<PageId>,
    ) -> Result<BTreeSet<PageId>, PermissionError<E>> {
        self.transaction(async |store| {
            let page = get_page(store, page_id).await?;

            if let Some(parent_id) = new_parent_id {
                let parent = get_page(store, &parent_id).await?;
                if parent.space_id != page.space_id {
                    return Err(PermissionError::InvalidState(format!(
                        "can't move page {page_id} into another space"
                    )));
                }
                if self.is_descendant(store, &parent_id, page_id).await? {
                    return Err(PermissionError::InvalidState(format!(
                        "can't move page {page_id} into its own subtree"
                    )));
                }
            }

            store
                .set_parent(page_id, new_parent_id)
                .await
                .map_err(PermissionError::Store)?;
            let affected = reconcile_subtree(store, page_id).await?;

            debug!(
                page_id = %page_id,
                parent_id = ?new_parent_id,
                pages = affected.len(),
                "moved page"
            );

            Ok(affected)
        })
        .await
    }

    /// Returns true if `page_id` is `ancestor_id` itself or lives somewhere below it.
    async fn is_descendant(
        &self,
        store: &S,
        page_id: &PageId,
        ancestor_id: &PageId,
    ) -> Result<bool, PermissionError<E>> {
        let mut current = Some(*page_id);
        for _ in 0..=self.config.max_depth {
            match current {
                Some(id) if id == *ancestor_id => return Ok(true),
                Some(id) => {
                    current = store.get_parent(&id).await.map_err(PermissionError::Store)?;
                }
                None => return Ok(false),
            }
        }

        Err(PermissionError::InvalidState(format!(
            "page tree above {page_id} is deeper than {} levels",
            self.config.max_depth
        )))
    }

    /// Delete a page together with its whole subtree and all of their grants.
    ///
    /// Returns the deleted pages.
    pub async fn delete_page(&self, page_id: &PageId) -> Result<Vec<PageId>, PermissionError<E>> {
        self.transaction(async |store| {
            get_page(store, page_id).await?;

            let mut subtree = Vec::new();
            let mut queue = VecDeque::from([*page_id]);
            while let Some(id) = queue.pop_front() {
                if subtree.contains(&id) {
                    continue;
                }
                subtree.push(id);
                queue.extend(
                    store
                        .get_children(&id)
                        .await
                        .map_err(PermissionError::Store)?,
                );
            }

            // Leaves first.
            for id in subtree.iter().rev() {
                let grants = store.find_by_page(id).await.map_err(PermissionError::Store)?;
                for grant in grants {
                    store
                        .delete_grant(&grant.id)
                        .await
                        .map_err(PermissionError::Store)?;
                    if grant.is_local() {
                        propagate_grant_change(store, &grant.id, ChangeKind::Deleted).await?;
                    }
                }
                store.delete_page(id).await.map_err(PermissionError::Store)?;
            }

            debug!(page_id = %page_id, pages = subtree.len(), "deleted page");

            Ok(subtree)
        })
        .await
    }

    // Grants
    // ~~~~~~

    /// Author a local grant for `assignee` on a page or change the level of an existing one.
    ///
    /// An inherited grant for the same assignee is replaced by the local one, which then becomes
    /// the source for the whole subtree below the page. Grants of other assignees stay as they
    /// are.
    pub async fn upsert_grant(
        &self,
        page_id: &PageId,
        assignee: Assignee,
        level: PermissionLevel,
    ) -> Result<Grant, PermissionError<E>> {
        self.transaction(async |store| {
            let page = get_page(store, page_id).await?;
            self.validate(&assignee, level, &page.space_id)?;

            let existing = store
                .find_by_page(page_id)
                .await
                .map_err(PermissionError::Store)?
                .into_iter()
                .find(|grant| grant.assignee == assignee);

            match existing {
                Some(grant) if grant.is_local() => {
                    if grant.level == level {
                        return Ok(grant);
                    }
                    let updated = Grant { level, ..grant };
                    store
                        .update_grant(&updated)
                        .await
                        .map_err(PermissionError::Store)?;
                    let affected =
                        propagate_grant_change(store, &updated.id, ChangeKind::Updated).await?;
                    debug!(grant_id = %updated.id, %level, pages = affected.len(), "updated grant");
                    Ok(updated)
                }
                existing => {
                    if let Some(inherited) = existing {
                        store
                            .delete_grant(&inherited.id)
                            .await
                            .map_err(PermissionError::Store)?;
                    }

                    let grant = Grant::local(Resource::Page(*page_id), assignee, level);
                    store
                        .insert_grant(&grant)
                        .await
                        .map_err(PermissionError::Store)?;
                    let affected = reconcile_subtree_for(store, page_id, &assignee).await?;
                    debug!(grant_id = %grant.id, %level, pages = affected.len(), "added grant");
                    Ok(grant)
                }
            }
        })
        .await
    }

    /// Delete a local page grant and every grant inherited from it.
    ///
    /// Pages below do not fall back to grants of higher ancestors. Inherited grants can't be
    /// deleted on their own, they follow their source.
    pub async fn delete_grant(
        &self,
        grant_id: &GrantId,
    ) -> Result<BTreeSet<PageId>, PermissionError<E>> {
        self.transaction(async |store| {
            let grant = get_grant(store, grant_id).await?;
            if grant.page_id().is_none() {
                return Err(PermissionError::InvalidState(format!(
                    "grant {grant_id} is a space default"
                )));
            }
            delete_local_grant(store, &grant).await
        })
        .await
    }

    /// Grants of a page.
    pub async fn permissions(&self, page_id: &PageId) -> Result<Vec<Grant>, PermissionError<E>> {
        get_page(&self.store, page_id).await?;
        self.store
            .find_by_page(page_id)
            .await
            .map_err(PermissionError::Store)
    }

    // Space defaults
    // ~~~~~~~~~~~~~~

    /// Create or change a default grant of a space.
    ///
    /// New defaults are inherited by every root page of the space and their subtrees, pages
    /// holding a local grant for the same assignee keep it.
    pub async fn set_space_default(
        &self,
        space_id: &SpaceId,
        assignee: Assignee,
        level: PermissionLevel,
    ) -> Result<Grant, PermissionError<E>> {
        self.transaction(async |store| {
            self.validate(&assignee, level, space_id)?;

            let existing = store
                .find_space_defaults(space_id)
                .await
                .map_err(PermissionError::Store)?
                .into_iter()
                .find(|grant| grant.assignee == assignee);

            if let Some(grant) = existing {
                if grant.level == level {
                    return Ok(grant);
                }
                let updated = Grant { level, ..grant };
                store
                    .update_grant(&updated)
                    .await
                    .map_err(PermissionError::Store)?;
                let affected =
                    propagate_grant_change(store, &updated.id, ChangeKind::Updated).await?;
                debug!(
                    space_id = %space_id,
                    %level,
                    pages = affected.len(),
                    "updated space default"
                );
                return Ok(updated);
            }

            let grant = Grant::local(Resource::SpaceDefaults(*space_id), assignee, level);
            store
                .insert_grant(&grant)
                .await
                .map_err(PermissionError::Store)?;

            let roots: Vec<Page> = store
                .list_pages(space_id)
                .await
                .map_err(PermissionError::Store)?
                .into_iter()
                .filter(Page::is_root)
                .collect();
            let mut affected = BTreeSet::new();
            for root in roots {
                affected.extend(reconcile_subtree_for(store, &root.id, &assignee).await?);
            }

            debug!(space_id = %space_id, %level, pages = affected.len(), "added space default");

            Ok(grant)
        })
        .await
    }

    /// Delete a default grant of a space together with every grant inherited from it.
    pub async fn delete_space_default(
        &self,
        grant_id: &GrantId,
    ) -> Result<BTreeSet<PageId>, PermissionError<E>> {
        self.transaction(async |store| {
            let grant = get_grant(store, grant_id).await?;
            if grant.page_id().is_some() {
                return Err(PermissionError::InvalidState(format!(
                    "grant {grant_id} is not a space default"
                )));
            }
            delete_local_grant(store, &grant).await
        })
        .await
    }

    /// Default grants of a space.
    pub async fn space_defaults(
        &self,
        space_id: &SpaceId,
    ) -> Result<Vec<Grant>, PermissionError<E>> {
        self.store
            .find_space_defaults(space_id)
            .await
            .map_err(PermissionError::Store)
    }

    fn validate(
        &self,
        assignee: &Assignee,
        level: PermissionLevel,
        space_id: &SpaceId,
    ) -> Result<(), PermissionError<E>> {
        match assignee {
            Assignee::Public if level > self.config.public_level_cap => {
                Err(PermissionError::InvalidState(format!(
                    "public grants are limited to '{}', got '{level}'",
                    self.config.public_level_cap
                )))
            }
            Assignee::Space(id) if id != space_id => Err(PermissionError::InvalidState(format!(
                "can't grant access to members of space {id} in space {space_id}"
            ))),
            _ => Ok(()),
        }
    }

    // Memberships
    // ~~~~~~~~~~~

    /// Insert or replace a user's membership, returns `true` if the user is a new member.
    pub async fn set_membership(
        &self,
        membership: &SpaceMembership,
    ) -> Result<bool, PermissionError<E>> {
        self.transaction(async |store| {
            store
                .set_membership(membership)
                .await
                .map_err(PermissionError::Store)
        })
        .await
    }

    /// Remove a user from a space, returns `false` if the user was not a member.
    pub async fn remove_membership(
        &self,
        user_id: &UserId,
        space_id: &SpaceId,
    ) -> Result<bool, PermissionError<E>> {
        self.transaction(async |store| {
            store
                .remove_membership(user_id, space_id)
                .await
                .map_err(PermissionError::Store)
        })
        .await
    }

    // Compute
    // ~~~~~~~

    /// Highest level the user holds on a page.
    pub async fn compute_effective(
        &self,
        page_id: &PageId,
        user_id: Option<UserId>,
    ) -> Result<Option<PermissionLevel>, PermissionError<E>> {
        compute::compute_effective(&self.store, &self.config, page_id, user_id).await
    }

    /// Levels of the user on many pages, unknown pages are left out.
    pub async fn bulk_compute_effective(
        &self,
        user_id: Option<UserId>,
        page_ids: &[PageId],
    ) -> Result<HashMap<PageId, Option<PermissionLevel>>, PermissionError<E>> {
        compute::bulk_compute_effective(&self.store, &self.config, user_id, page_ids).await
    }

    /// Operations the user may perform on a page.
    pub async fn compute_operations(
        &self,
        page_id: &PageId,
        user_id: Option<UserId>,
    ) -> Result<PageOperations, PermissionError<E>> {
        compute::compute_operations(&self.store, &self.config, page_id, user_id).await
    }

    // Audit
    // ~~~~~

    /// Report all broken invariants of a space.
    pub async fn audit_space(
        &self,
        space_id: &SpaceId,
    ) -> Result<Vec<Violation>, PermissionError<E>> {
        audit::audit_space(&self.store, space_id).await
    }

    /// Fail with a consistency error if the page or its grants break an invariant.
    pub async fn verify_page(&self, page_id: &PageId) -> Result<(), PermissionError<E>> {
        audit::verify_page(&self.store, page_id).await
    }
}

async fn get_page<S, E>(store: &S, page_id: &PageId) -> Result<Page, PermissionError<E>>
where
    S: PageStore<Error = E>,
{
    store
        .get_page(page_id)
        .await
        .map_err(PermissionError::Store)?
        .ok_or(PermissionError::PageNotFound(*page_id))
}

async fn get_grant<S, E>(store: &S, grant_id: &GrantId) -> Result<Grant, PermissionError<E>>
where
    S: GrantStore<Error = E>,
{
    store
        .get_grant(grant_id)
        .await
        .map_err(PermissionError::Store)?
        .ok_or(PermissionError::GrantNotFound(*grant_id))
}

async fn delete_local_grant<S, E>(
    store: &S,
    grant: &Grant,
) -> Result<BTreeSet<PageId>, PermissionError<E>>
where
    S: GrantStore<Error = E>,
{
    if !grant.is_local() {
        return Err(PermissionError::InvalidState(format!(
            "grant {} is inherited, delete its source instead",
            grant.id
        )));
    }

    store
        .delete_grant(&grant.id)
        .await
        .map_err(PermissionError::Store)?;
    let mut affected = propagate_grant_change(store, &grant.id, ChangeKind::Deleted).await?;
    if let Some(page_id) = grant.page_id() {
        affected.insert(page_id);
    }

    debug!(grant_id = %grant.id, pages = affected.len(), "deleted grant");

    Ok(affected)
}
