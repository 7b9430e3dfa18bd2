// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use arbor_core::{Grant, GrantId, Page, PageId, Resource, SpaceId, SpaceMembership, UserId};
use thiserror::Error;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard, Semaphore};
use tracing::trace;

use crate::traits::TransactionPermit;

/// In-memory store.
///
/// This does not persist data permamently, all changes are lost when the process ends. Use this
/// only in development or test contexts.
///
/// Transactions behave like the SQLite ones: only one can be open at a time and writes only go
/// through the handle returned by `transactional`. An open transaction works on a copy of the
/// committed state, other handles keep reading the committed state until the copy replaces it on
/// commit or is thrown away on rollback.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    semaphore: Arc<Semaphore>,
    transactional: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            semaphore: Arc::new(Semaphore::new(1)),
            transactional: false,
        }
    }

    /// Lock the state for reading.
    ///
    /// Transactional handles see the uncommitted state of the open transaction, all others the
    /// committed one.
    pub(crate) async fn read(&self) -> MappedMutexGuard<'_, MemoryState> {
        let transactional = self.transactional;
        MutexGuard::map(self.inner.lock().await, |inner| match inner.pending.as_mut() {
            Some(pending) if transactional => pending,
            _ => &mut inner.committed,
        })
    }

    /// Lock the uncommitted state for writing, fails if no transaction was started or this is not
    /// a transactional handle.
    pub(crate) async fn write(&self) -> Result<MappedMutexGuard<'_, MemoryState>, MemoryError> {
        if !self.transactional {
            return Err(MemoryError::TransactionMissing);
        }

        MutexGuard::try_map(self.inner.lock().await, |inner| inner.pending.as_mut())
            .map_err(|_| MemoryError::TransactionMissing)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct Inner {
    committed: MemoryState,
    pending: Option<MemoryState>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MemoryState {
    pub(crate) pages: HashMap<PageId, Page>,
    pub(crate) children: HashMap<PageId, BTreeSet<PageId>>,
    pub(crate) grants: HashMap<GrantId, Grant>,
    pub(crate) grants_by_resource: HashMap<Resource, BTreeSet<GrantId>>,
    pub(crate) grants_by_source: HashMap<GrantId, BTreeSet<GrantId>>,
    pub(crate) memberships: HashMap<(UserId, SpaceId), SpaceMembership>,
}

// Trait implementations are in the regarding modules, see for example `pages` or `grants` etc.

impl crate::traits::Transaction for MemoryStore {
    type Error = MemoryError;

    type Permit = TransactionPermit;

    async fn begin(&self) -> Result<TransactionPermit, MemoryError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("if semaphore is closed then the whole struct is gone as well");

        let mut inner = self.inner.lock().await;
        if inner.pending.is_some() {
            return Err(MemoryError::TransactionDangling);
        }
        inner.pending = Some(inner.committed.clone());
        trace!("began in-memory transaction");

        Ok(TransactionPermit(permit))
    }

    async fn rollback(&self, permit: TransactionPermit) -> Result<(), MemoryError> {
        let mut inner = self.inner.lock().await;
        let result = match inner.pending.take() {
            Some(_) => {
                trace!("rolled back in-memory transaction");
                Ok(())
            }
            None => Err(MemoryError::TransactionMissing),
        };

        drop(permit);

        result
    }

    async fn commit(&self, permit: TransactionPermit) -> Result<(), MemoryError> {
        let mut inner = self.inner.lock().await;
        let result = match inner.pending.take() {
            Some(pending) => {
                inner.committed = pending;
                trace!("committed in-memory transaction");
                Ok(())
            }
            None => Err(MemoryError::TransactionMissing),
        };

        drop(permit);

        result
    }

    fn transactional(&self) -> Self {
        Self {
            transactional: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Writes can only ever occur through a transactional handle, after a transaction was started.
    #[error("tried to interact with inexistant transaction")]
    TransactionMissing,

    /// A previous permit was dropped without committing or rolling back.
    #[error("previous transaction was neither committed nor rolled back")]
    TransactionDangling,
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use arbor_core::{Page, PageId, SpaceId};
    use assert_matches::assert_matches;
    use futures_test::task::noop_context;
    use tokio::pin;

    use crate::pages::PageStore;
    use crate::traits::Transaction;

    use super::{MemoryError, MemoryStore};

    #[tokio::test]
    async fn writes_require_transaction() {
        let store = MemoryStore::new();
        let tx = store.transactional();
        let page = Page::new(PageId::random(), SpaceId::random(), None);

        assert_matches!(
            tx.insert_page(&page).await,
            Err(MemoryError::TransactionMissing)
        );

        let permit = store.begin().await.unwrap();
        assert!(tx.insert_page(&page).await.unwrap());

        // Other handles can't write into the open transaction.
        assert_matches!(
            store.insert_page(&page).await,
            Err(MemoryError::TransactionMissing)
        );

        // .. attempting to start a second one should make us wait.
        assert!(matches!(
            {
                let fut = store.begin();
                let mut cx = noop_context();
                pin!(fut);
                fut.poll(&mut cx)
            },
            Poll::Pending
        ));

        store.commit(permit).await.unwrap();
        assert_eq!(store.get_page(&page.id).await.unwrap(), Some(page));
    }

    #[tokio::test]
    async fn rollback_restores_state() {
        let store = MemoryStore::new();
        let tx = store.transactional();
        let space_id = SpaceId::random();
        let kept = Page::new(PageId::random(), space_id, None);
        let discarded = Page::new(PageId::random(), space_id, Some(kept.id));

        let permit = store.begin().await.unwrap();
        tx.insert_page(&kept).await.unwrap();
        store.commit(permit).await.unwrap();

        let permit = store.begin().await.unwrap();
        tx.insert_page(&discarded).await.unwrap();

        // Uncommitted writes are only visible through the transactional handle.
        assert_eq!(tx.get_children(&kept.id).await.unwrap(), vec![discarded.id]);
        assert!(store.get_children(&kept.id).await.unwrap().is_empty());
        assert_eq!(store.clone().get_page(&discarded.id).await.unwrap(), None);

        store.rollback(permit).await.unwrap();

        assert_eq!(tx.get_page(&discarded.id).await.unwrap(), None);
        assert!(tx.get_children(&kept.id).await.unwrap().is_empty());
        assert_eq!(store.get_page(&kept.id).await.unwrap(), Some(kept));
    }
}
