// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consistency checks over stored pages and grants.
//!
//! Violations are reported, never repaired. A clean store satisfies:
//!
//! - every inherited grant points at an existing, local grant,
//! - that source lives on a strict ancestor of the grant's page or on the space defaults,
//! - a resource holds at most one grant per assignee,
//! - a page lives in the same space as its parent and the page tree has no cycles.
use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;

use arbor_core::{Assignee, Grant, GrantId, Page, PageId, Resource, SpaceId};
use arbor_store::{GrantStore, PageStore};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};
use tracing::{debug, warn};

use crate::error::PermissionError;

/// A broken invariant found in stored state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// Inherited grant points at a grant which does not exist.
    DanglingSource { grant_id: GrantId, source_id: GrantId },

    /// Inherited grant points at another inherited grant instead of the original source.
    ChainedSource { grant_id: GrantId, source_id: GrantId },

    /// Inherited grant points at a grant outside of its page's ancestry.
    ForeignSource { grant_id: GrantId, source_id: GrantId },

    /// Space default grants are always authored locally.
    InheritedSpaceDefault { grant_id: GrantId },

    /// More than one grant for the same assignee on one resource.
    DuplicateAssignee {
        resource: Resource,
        assignee: Assignee,
    },

    /// Page refers to a parent which does not exist.
    MissingParent { page_id: PageId, parent_id: PageId },

    /// Page lives in a different space than its parent.
    CrossSpaceParent { page_id: PageId, parent_id: PageId },

    /// The page tree of the space contains a cycle.
    CyclicTree { space_id: SpaceId },
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::DanglingSource {
                grant_id,
                source_id,
            } => write!(f, "grant {grant_id} inherits from missing grant {source_id}"),
            Violation::ChainedSource {
                grant_id,
                source_id,
            } => write!(
                f,
                "grant {grant_id} inherits from inherited grant {source_id}"
            ),
            Violation::ForeignSource {
                grant_id,
                source_id,
            } => write!(
                f,
                "grant {grant_id} inherits from grant {source_id} outside of its ancestry"
            ),
            Violation::InheritedSpaceDefault { grant_id } => {
                write!(f, "space default grant {grant_id} is not local")
            }
            Violation::DuplicateAssignee { resource, assignee } => {
                write!(f, "{resource} holds more than one grant for {assignee}")
            }
            Violation::MissingParent { page_id, parent_id } => {
                write!(f, "page {page_id} refers to missing parent {parent_id}")
            }
            Violation::CrossSpaceParent { page_id, parent_id } => write!(
                f,
                "page {page_id} lives in another space than its parent {parent_id}"
            ),
            Violation::CyclicTree { space_id } => {
                write!(f, "page tree of space {space_id} contains a cycle")
            }
        }
    }
}

/// Check all pages and grants of a space.
pub async fn audit_space<S, E>(
    store: &S,
    space_id: &SpaceId,
) -> Result<Vec<Violation>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    let pages = store
        .list_pages(space_id)
        .await
        .map_err(PermissionError::Store)?;

    let mut violations = Vec::new();

    // Edges point from parent to child.
    let mut tree: DiGraphMap<PageId, ()> = DiGraphMap::new();
    for page in &pages {
        tree.add_node(page.id);
        if let Some(parent_id) = page.parent_id {
            if let Some(violation) = check_parent(store, page, &parent_id).await? {
                violations.push(violation);
            }
            tree.add_edge(parent_id, page.id, ());
        }
    }

    if is_cyclic_directed(&tree) {
        violations.push(Violation::CyclicTree {
            space_id: *space_id,
        });
    }

    let defaults = store
        .find_space_defaults(space_id)
        .await
        .map_err(PermissionError::Store)?;
    violations.extend(duplicate_assignees(&defaults));
    violations.extend(
        defaults
            .iter()
            .filter(|grant| !grant.is_local())
            .map(|grant| Violation::InheritedSpaceDefault { grant_id: grant.id }),
    );

    for page in &pages {
        let ancestors = ancestors_in(&tree, page.id);
        violations.extend(check_grants(store, page, &ancestors).await?);
    }

    if violations.is_empty() {
        debug!(space_id = %space_id, pages = pages.len(), "audited space");
    } else {
        warn!(
            space_id = %space_id,
            count = violations.len(),
            "found permission invariant violations"
        );
    }

    Ok(violations)
}

/// Check the parent and the grants of a single page, failing with the first violation found.
pub async fn verify_page<S, E>(store: &S, page_id: &PageId) -> Result<(), PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E>,
{
    let page = store
        .get_page(page_id)
        .await
        .map_err(PermissionError::Store)?
        .ok_or(PermissionError::PageNotFound(*page_id))?;

    if let Some(parent_id) = page.parent_id {
        if let Some(violation) = check_parent(store, &page, &parent_id).await? {
            return Err(PermissionError::Consistency(violation.to_string()));
        }
    }

    // Walk up the tree, stop when reaching the root or running into a cycle.
    let mut ancestors = HashSet::new();
    let mut current = page.parent_id;
    while let Some(ancestor_id) = current {
        if ancestor_id == page.id || !ancestors.insert(ancestor_id) {
            return Err(PermissionError::Consistency(
                Violation::CyclicTree {
                    space_id: page.space_id,
                }
                .to_string(),
            ));
        }
        current = store
            .get_parent(&ancestor_id)
            .await
            .map_err(PermissionError::Store)?;
    }

    match check_grants(store, &page, &ancestors).await?.first() {
        Some(violation) => Err(PermissionError::Consistency(violation.to_string())),
        None => Ok(()),
    }
}

/// All strict ancestors of a page in the tree graph.
fn ancestors_in(tree: &DiGraphMap<PageId, ()>, page_id: PageId) -> HashSet<PageId> {
    let reversed = Reversed(tree);
    let mut dfs = Dfs::new(&reversed, page_id);
    let mut ancestors = HashSet::new();
    while let Some(node) = dfs.next(&reversed) {
        if node != page_id {
            ancestors.insert(node);
        }
    }
    ancestors
}

async fn check_parent<S, E>(
    store: &S,
    page: &Page,
    parent_id: &PageId,
) -> Result<Option<Violation>, PermissionError<E>>
where
    S: PageStore<Error = E>,
{
    let parent = store
        .get_page(parent_id)
        .await
        .map_err(PermissionError::Store)?;

    Ok(match parent {
        None => Some(Violation::MissingParent {
            page_id: page.id,
            parent_id: *parent_id,
        }),
        Some(parent) if parent.space_id != page.space_id => Some(Violation::CrossSpaceParent {
            page_id: page.id,
            parent_id: *parent_id,
        }),
        Some(_) => None,
    })
}

async fn check_grants<S, E>(
    store: &S,
    page: &Page,
    ancestors: &HashSet<PageId>,
) -> Result<Vec<Violation>, PermissionError<E>>
where
    S: GrantStore<Error = E>,
{
    let grants = store
        .find_by_page(&page.id)
        .await
        .map_err(PermissionError::Store)?;

    let mut violations = duplicate_assignees(&grants);

    for grant in &grants {
        let Some(source_id) = grant.inherited_from() else {
            continue;
        };

        let source = store
            .get_grant(&source_id)
            .await
            .map_err(PermissionError::Store)?;

        let violation = match source {
            None => Some(Violation::DanglingSource {
                grant_id: grant.id,
                source_id,
            }),
            Some(source) if !source.is_local() => Some(Violation::ChainedSource {
                grant_id: grant.id,
                source_id,
            }),
            Some(source) => {
                let in_ancestry = match source.resource {
                    Resource::Page(id) => ancestors.contains(&id),
                    Resource::SpaceDefaults(id) => id == page.space_id,
                };
                (!in_ancestry).then_some(Violation::ForeignSource {
                    grant_id: grant.id,
                    source_id,
                })
            }
        };

        violations.extend(violation);
    }

    Ok(violations)
}

fn duplicate_assignees(grants: &[Grant]) -> Vec<Violation> {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    grants
        .iter()
        .filter(|grant| !seen.insert((grant.resource, grant.assignee)))
        .filter(|grant| reported.insert((grant.resource, grant.assignee)))
        .map(|grant| Violation::DuplicateAssignee {
            resource: grant.resource,
            assignee: grant.assignee,
        })
        .collect()
}
