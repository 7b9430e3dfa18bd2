// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::{Page, PageId, SpaceId};

use crate::assert_all_stores;
use crate::pages::PageStore;
use crate::traits::Transaction;

#[tokio::test]
async fn insert_get_delete_pages() {
    assert_all_stores!(|store| async {
        let space_id = SpaceId::random();
        let root = Page::new(PageId::random(), space_id, None);
        let child = Page::new(PageId::random(), space_id, Some(root.id));

        let tx = store.transactional();
        let permit = store.begin().await.unwrap();

        // Insert
        // ~~~~~~

        assert!(tx.insert_page(&root).await.unwrap());
        assert!(tx.insert_page(&child).await.unwrap());
        // Re-inserting the same page returns false.
        assert!(!tx.insert_page(&root).await.unwrap());

        // Get
        // ~~~

        assert_eq!(tx.get_page(&root.id).await.unwrap(), Some(root));
        assert_eq!(tx.get_parent(&child.id).await.unwrap(), Some(root.id));
        assert_eq!(tx.get_parent(&root.id).await.unwrap(), None);
        assert_eq!(tx.get_space_id(&child.id).await.unwrap(), Some(space_id));
        assert_eq!(tx.get_children(&root.id).await.unwrap(), vec![child.id]);
        assert_eq!(tx.get_page(&PageId::random()).await.unwrap(), None);

        // Delete
        // ~~~~~~

        assert!(tx.delete_page(&child.id).await.unwrap());
        assert!(!tx.delete_page(&child.id).await.unwrap());
        assert!(tx.get_children(&root.id).await.unwrap().is_empty());

        store.commit(permit).await.unwrap();
    });
}

#[tokio::test]
async fn reparent_pages() {
    assert_all_stores!(|store| async {
        let space_id = SpaceId::random();
        let a = Page::new(PageId::random(), space_id, None);
        let b = Page::new(PageId::random(), space_id, None);
        let c = Page::new(PageId::random(), space_id, Some(a.id));

        let tx = store.transactional();
        let permit = store.begin().await.unwrap();
        for page in [&a, &b, &c] {
            tx.insert_page(page).await.unwrap();
        }

        assert!(tx.set_parent(&c.id, Some(b.id)).await.unwrap());
        assert!(tx.get_children(&a.id).await.unwrap().is_empty());
        assert_eq!(tx.get_children(&b.id).await.unwrap(), vec![c.id]);
        assert_eq!(tx.get_parent(&c.id).await.unwrap(), Some(b.id));

        // Detach to the root level.
        assert!(tx.set_parent(&c.id, None).await.unwrap());
        assert!(tx.get_children(&b.id).await.unwrap().is_empty());
        assert_eq!(tx.get_parent(&c.id).await.unwrap(), None);

        // Unknown pages can't be moved.
        assert!(!tx.set_parent(&PageId::random(), None).await.unwrap());

        store.commit(permit).await.unwrap();
    });
}

#[tokio::test]
async fn list_pages_of_space() {
    assert_all_stores!(|store| async {
        let space_1 = SpaceId::random();
        let space_2 = SpaceId::random();
        let pages_1 = [
            Page::new(PageId::random(), space_1, None),
            Page::new(PageId::random(), space_1, None),
        ];
        let other = Page::new(PageId::random(), space_2, None);

        let tx = store.transactional();
        let permit = store.begin().await.unwrap();
        for page in pages_1.iter().chain([&other]) {
            tx.insert_page(page).await.unwrap();
        }
        store.commit(permit).await.unwrap();

        let mut expected = pages_1.to_vec();
        expected.sort_by_key(|page| page.id);
        assert_eq!(store.list_pages(&space_1).await.unwrap(), expected);
        assert_eq!(store.list_pages(&space_2).await.unwrap(), vec![other]);
    });
}

#[tokio::test]
async fn other_handles_read_committed_state() {
    assert_all_stores!(|store| async {
        let space_id = SpaceId::random();
        let committed = Page::new(PageId::random(), space_id, None);
        let uncommitted = Page::new(PageId::random(), space_id, Some(committed.id));

        let tx = store.transactional();
        let permit = store.begin().await.unwrap();
        tx.insert_page(&committed).await.unwrap();
        store.commit(permit).await.unwrap();

        let reader = store.clone();
        let permit = store.begin().await.unwrap();
        tx.insert_page(&uncommitted).await.unwrap();
        assert_eq!(tx.get_children(&committed.id).await.unwrap(), vec![uncommitted.id]);

        // Readers outside of the transaction either see the committed state right away or wait
        // for the transaction to end, they never see its writes.
        let (children, page, _) = tokio::join!(
            reader.get_children(&committed.id),
            reader.get_page(&uncommitted.id),
            async {
                store.rollback(permit).await.unwrap();
            }
        );
        assert!(children.unwrap().is_empty());
        assert_eq!(page.unwrap(), None);
        assert_eq!(reader.list_pages(&space_id).await.unwrap(), vec![committed]);
    });
}
