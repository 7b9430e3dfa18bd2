// SPDX-License-Identifier: MIT OR Apache-2.0

/// Macro to run the same test logic against all store backend implementations.
///
/// This macro takes a closure that will be executed against each store type:
/// - In-memory store (`MemoryStore`)
/// - SQLite store (`SqliteStore`)
///
/// Stores are handed over without an open transaction, the test body decides when to `begin`,
/// `commit` or `rollback`.
///
/// ## Example
///
/// ```rust
/// # use arbor_core::{Page, PageId, SpaceId};
/// # use arbor_store::{PageStore, Transaction};
/// # use arbor_store::assert_all_stores;
/// # async fn run() {
/// assert_all_stores!(|store| async {
///     let page = Page::new(PageId::random(), SpaceId::random(), None);
///     let permit = store.begin().await.unwrap();
///     store.transactional().insert_page(&page).await.unwrap();
///     store.commit(permit).await.unwrap();
///     assert_eq!(store.get_page(&page.id).await.unwrap(), Some(page));
/// });
/// # }
/// ```
#[macro_export]
macro_rules! assert_all_stores {
    (|$store:ident| $test_body:expr) => {
        // Test with MemoryStore.
        {
            let $store = $crate::memory::MemoryStore::default();
            $test_body.await;
        }

        // Test with SqliteStore.
        {
            let $store = $crate::sqlite::SqliteStore::temporary().await;
            $test_body.await;
        }
    };
}
