// SPDX-License-Identifier: MIT OR Apache-2.0

//! Effective permissions of users on pages.
//!
//! All inheritance is materialised in the permission set of every page, computing a level is
//! hence a single pass over the grants of that page, without walking up the tree.
use std::collections::HashMap;

use arbor_core::{
    Assignee, Grant, PageId, PageOperations, PermissionLevel, SpaceId, SpaceMembership, UserId,
};
use arbor_store::{GrantStore, MembershipStore, PageStore};

use crate::config::Config;
use crate::error::PermissionError;

/// Highest permission level the user holds on a page, `None` if no grant applies.
///
/// Anonymous (`None`) and unknown users only receive public grants.
pub async fn compute_effective<S, E>(
    store: &S,
    config: &Config,
    page_id: &PageId,
    user_id: Option<UserId>,
) -> Result<Option<PermissionLevel>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E> + MembershipStore<Error = E>,
{
    let page = store
        .get_page(page_id)
        .await
        .map_err(PermissionError::Store)?
        .ok_or(PermissionError::PageNotFound(*page_id))?;

    let membership = match user_id {
        Some(user_id) => store
            .membership(&user_id, &page.space_id)
            .await
            .map_err(PermissionError::Store)?,
        None => None,
    };

    let grants = store
        .find_by_page(page_id)
        .await
        .map_err(PermissionError::Store)?;

    Ok(effective_level(config, &grants, user_id, membership.as_ref()))
}

/// Effective levels of one user on many pages.
///
/// Memberships are looked up once per space. Pages which do not exist are left out of the result.
pub async fn bulk_compute_effective<S, E>(
    store: &S,
    config: &Config,
    user_id: Option<UserId>,
    page_ids: &[PageId],
) -> Result<HashMap<PageId, Option<PermissionLevel>>, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E> + MembershipStore<Error = E>,
{
    let mut pages = Vec::with_capacity(page_ids.len());
    for page_id in page_ids {
        if let Some(page) = store
            .get_page(page_id)
            .await
            .map_err(PermissionError::Store)?
        {
            pages.push(page);
        }
    }

    let mut memberships: HashMap<SpaceId, Option<SpaceMembership>> = HashMap::new();
    if let Some(user_id) = user_id {
        for page in &pages {
            if memberships.contains_key(&page.space_id) {
                continue;
            }
            let membership = store
                .membership(&user_id, &page.space_id)
                .await
                .map_err(PermissionError::Store)?;
            memberships.insert(page.space_id, membership);
        }
    }

    let ids: Vec<PageId> = pages.iter().map(|page| page.id).collect();
    let grants = store
        .find_by_pages(&ids)
        .await
        .map_err(PermissionError::Store)?;

    Ok(pages
        .iter()
        .map(|page| {
            let membership = memberships.get(&page.space_id).and_then(Option::as_ref);
            let grants = grants.get(&page.id).map(Vec::as_slice).unwrap_or_default();
            (page.id, effective_level(config, grants, user_id, membership))
        })
        .collect())
}

/// Operations the user may perform on a page.
pub async fn compute_operations<S, E>(
    store: &S,
    config: &Config,
    page_id: &PageId,
    user_id: Option<UserId>,
) -> Result<PageOperations, PermissionError<E>>
where
    S: PageStore<Error = E> + GrantStore<Error = E> + MembershipStore<Error = E>,
{
    let level = compute_effective(store, config, page_id, user_id).await?;
    Ok(PageOperations::from(level))
}

/// Merge the grants of one permission set into the level of a user.
pub fn effective_level(
    config: &Config,
    grants: &[Grant],
    user_id: Option<UserId>,
    membership: Option<&SpaceMembership>,
) -> Option<PermissionLevel> {
    if config.admin_full_access && membership.is_some_and(|membership| membership.is_admin) {
        return Some(PermissionLevel::FullAccess);
    }

    grants
        .iter()
        .filter(|grant| applies_to(&grant.assignee, user_id, membership))
        .map(|grant| grant.level)
        .max()
}

fn applies_to(
    assignee: &Assignee,
    user_id: Option<UserId>,
    membership: Option<&SpaceMembership>,
) -> bool {
    match assignee {
        Assignee::Public => true,
        // Direct grants also apply to users who are not a member of the space.
        Assignee::User(id) => user_id == Some(*id),
        Assignee::Role(_) | Assignee::Space(_) => {
            membership.is_some_and(|membership| membership.matches(assignee))
        }
    }
}

#[cfg(test)]
mod tests {
    use arbor_core::{
        Assignee, Grant, PageId, PermissionLevel, Resource, RoleId, SpaceId, SpaceMembership,
        UserId,
    };

    use crate::config::Config;

    use super::effective_level;

    fn grant(assignee: Assignee, level: PermissionLevel) -> Grant {
        Grant::local(Resource::Page(PageId::random()), assignee, level)
    }

    #[test]
    fn highest_matching_level_wins() {
        let config = Config::default();
        let user_id = UserId::random();
        let space_id = SpaceId::random();
        let role_id = RoleId::random();
        let membership = SpaceMembership::new(user_id, space_id).with_role(role_id);

        let grants = [
            grant(Assignee::Public, PermissionLevel::View),
            grant(Assignee::Space(space_id), PermissionLevel::ViewComment),
            grant(Assignee::Role(role_id), PermissionLevel::Editor),
            grant(Assignee::User(UserId::random()), PermissionLevel::FullAccess),
        ];

        assert_eq!(
            effective_level(&config, &grants, Some(user_id), Some(&membership)),
            Some(PermissionLevel::Editor)
        );

        // Adding a grant never lowers the result.
        let mut more = grants.to_vec();
        more.push(grant(Assignee::User(user_id), PermissionLevel::View));
        assert_eq!(
            effective_level(&config, &more, Some(user_id), Some(&membership)),
            Some(PermissionLevel::Editor)
        );
    }

    #[test]
    fn outsiders_only_see_public_and_direct_grants() {
        let config = Config::default();
        let user_id = UserId::random();
        let space_id = SpaceId::random();

        let grants = [
            grant(Assignee::Space(space_id), PermissionLevel::Editor),
            grant(Assignee::Role(RoleId::random()), PermissionLevel::Editor),
        ];
        assert_eq!(effective_level(&config, &grants, Some(user_id), None), None);
        assert_eq!(effective_level(&config, &grants, None, None), None);

        let grants = [
            grant(Assignee::Public, PermissionLevel::View),
            grant(Assignee::User(user_id), PermissionLevel::ViewComment),
        ];
        assert_eq!(
            effective_level(&config, &grants, Some(user_id), None),
            Some(PermissionLevel::ViewComment)
        );
        assert_eq!(
            effective_level(&config, &grants, None, None),
            Some(PermissionLevel::View)
        );
    }

    #[test]
    fn admins_get_full_access() {
        let user_id = UserId::random();
        let admin = SpaceMembership::new(user_id, SpaceId::random()).admin();

        assert_eq!(
            effective_level(&Config::default(), &[], Some(user_id), Some(&admin)),
            Some(PermissionLevel::FullAccess)
        );

        let config = Config {
            admin_full_access: false,
            ..Config::default()
        };
        assert_eq!(effective_level(&config, &[], Some(user_id), Some(&admin)), None);
    }
}
