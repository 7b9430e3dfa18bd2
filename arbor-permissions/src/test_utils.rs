// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities.
use arbor_core::{Assignee, GrantId, PageId, PermissionLevel, RoleId, SpaceId, UserId};
use arbor_store::{GrantStore, MembershipStore, PageStore, Transaction};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::error::PermissionError;
use crate::service::{NewPage, Permissions};

/// Print tracing output of tests when `RUST_LOG` is set.
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Deterministic sequence of random tree and grant edits on one space.
pub struct RandomWorkload {
    rng: ChaCha20Rng,
    space_id: SpaceId,
    users: Vec<UserId>,
    roles: Vec<RoleId>,
    pages: Vec<PageId>,
}

impl RandomWorkload {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let mut rng = ChaCha20Rng::from_seed(seed);
        let space_id = SpaceId::from_bytes(rng.random());
        let users = (0..4).map(|_| UserId::from_bytes(rng.random())).collect();
        let roles = (0..2).map(|_| RoleId::from_bytes(rng.random())).collect();

        Self {
            rng,
            space_id,
            users,
            roles,
            pages: Vec::new(),
        }
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    pub fn pages(&self) -> &[PageId] {
        &self.pages
    }

    fn random_assignee(&mut self) -> Assignee {
        match self.rng.random_range(0..4) {
            0 => Assignee::User(self.users[self.rng.random_range(0..self.users.len())]),
            1 => Assignee::Role(self.roles[self.rng.random_range(0..self.roles.len())]),
            2 => Assignee::Space(self.space_id),
            _ => Assignee::Public,
        }
    }

    fn random_level(&mut self, assignee: &Assignee) -> PermissionLevel {
        // Highest level public grants may carry under the default configuration.
        if assignee.is_public() {
            return PermissionLevel::View;
        }
        PermissionLevel::ALL[self.rng.random_range(0..PermissionLevel::ALL.len())]
    }

    fn random_page(&mut self) -> Option<PageId> {
        if self.pages.is_empty() {
            return None;
        }
        Some(self.pages[self.rng.random_range(0..self.pages.len())])
    }

    /// Apply `steps` random operations.
    ///
    /// Operations rejected with `InvalidState`, like moving a page into its own subtree or
    /// deleting an inherited grant, are expected and skipped. Any other error is returned.
    pub async fn run<S, E>(
        &mut self,
        permissions: &Permissions<S>,
        steps: usize,
    ) -> Result<(), PermissionError<E>>
    where
        S: PageStore<Error = E>
            + GrantStore<Error = E>
            + MembershipStore<Error = E>
            + Transaction<Error = E>,
    {
        for step in 0..steps {
            let result = match self.rng.random_range(0..7) {
                0 => {
                    let assignee = self.random_assignee();
                    let level = self.random_level(&assignee);
                    permissions
                        .set_space_default(&self.space_id, assignee, level)
                        .await
                        .map(|_| ())
                }
                1 | 2 => {
                    let parent_id = if self.rng.random_bool(0.8) {
                        self.random_page()
                    } else {
                        None
                    };
                    let new_page = NewPage {
                        id: PageId::from_bytes(self.rng.random()),
                        space_id: self.space_id,
                        parent_id,
                    };
                    let page = permissions.create_page(new_page).await?;
                    self.pages.push(page.id);
                    Ok(())
                }
                3 => match self.random_page() {
                    Some(page_id) => {
                        let new_parent_id =
                            self.random_page().filter(|_| self.rng.random_bool(0.8));
                        permissions
                            .move_page(&page_id, new_parent_id)
                            .await
                            .map(|_| ())
                    }
                    None => Ok(()),
                },
                4 => match self.random_page() {
                    Some(page_id) => {
                        let assignee = self.random_assignee();
                        let level = self.random_level(&assignee);
                        permissions
                            .upsert_grant(&page_id, assignee, level)
                            .await
                            .map(|_| ())
                    }
                    None => Ok(()),
                },
                5 => match self.random_grant(permissions).await? {
                    Some(grant_id) => permissions.delete_grant(&grant_id).await.map(|_| ()),
                    None => Ok(()),
                },
                _ => match self.random_page() {
                    // Deleting pages is rarer than creating them, keep the tree growing.
                    Some(page_id) if self.rng.random_bool(0.3) => {
                        let deleted = permissions.delete_page(&page_id).await?;
                        self.pages.retain(|id| !deleted.contains(id));
                        Ok(())
                    }
                    _ => Ok(()),
                },
            };

            match result {
                Ok(()) => (),
                Err(PermissionError::InvalidState(reason)) => {
                    trace!(step, "skipped rejected operation: {reason}");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    async fn random_grant<S, E>(
        &mut self,
        permissions: &Permissions<S>,
    ) -> Result<Option<GrantId>, PermissionError<E>>
    where
        S: PageStore<Error = E>
            + GrantStore<Error = E>
            + MembershipStore<Error = E>
            + Transaction<Error = E>,
    {
        let Some(page_id) = self.random_page() else {
            return Ok(None);
        };
        let grants = permissions.permissions(&page_id).await?;
        if grants.is_empty() {
            return Ok(None);
        }
        Ok(Some(grants[self.rng.random_range(0..grants.len())].id))
    }
}
