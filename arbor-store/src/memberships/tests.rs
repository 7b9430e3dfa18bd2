// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::{RoleId, SpaceId, SpaceMembership, UserId};

use crate::assert_all_stores;
use crate::memberships::MembershipStore;
use crate::traits::Transaction;

#[tokio::test]
async fn set_replace_remove_memberships() {
    assert_all_stores!(|store| async {
        let user_id = UserId::random();
        let space_id = SpaceId::random();
        let role_1 = RoleId::random();
        let role_2 = RoleId::random();

        let member = SpaceMembership::new(user_id, space_id)
            .with_role(role_1)
            .with_role(role_2);

        let tx = store.transactional();
        let permit = store.begin().await.unwrap();

        assert!(tx.set_membership(&member).await.unwrap());
        assert_eq!(
            tx.membership(&user_id, &space_id).await.unwrap(),
            Some(member.clone())
        );

        // Promote to admin and drop one role, the membership is replaced as a whole.
        let promoted = SpaceMembership::new(user_id, space_id)
            .admin()
            .with_role(role_2);
        assert!(!tx.set_membership(&promoted).await.unwrap());
        assert_eq!(
            tx.membership(&user_id, &space_id).await.unwrap(),
            Some(promoted)
        );

        // Memberships are scoped to their space.
        assert_eq!(
            tx.membership(&user_id, &SpaceId::random()).await.unwrap(),
            None
        );

        assert!(tx.remove_membership(&user_id, &space_id).await.unwrap());
        assert!(!tx.remove_membership(&user_id, &space_id).await.unwrap());
        assert_eq!(tx.membership(&user_id, &space_id).await.unwrap(), None);

        store.commit(permit).await.unwrap();
    });
}

#[tokio::test]
async fn re_added_member_starts_without_roles() {
    assert_all_stores!(|store| async {
        let user_id = UserId::random();
        let space_id = SpaceId::random();

        let tx = store.transactional();
        let permit = store.begin().await.unwrap();
        tx.set_membership(&SpaceMembership::new(user_id, space_id).with_role(RoleId::random()))
            .await
            .unwrap();
        tx.remove_membership(&user_id, &space_id).await.unwrap();

        let plain = SpaceMembership::new(user_id, space_id);
        assert!(tx.set_membership(&plain).await.unwrap());
        store.commit(permit).await.unwrap();

        assert_eq!(
            store.membership(&user_id, &space_id).await.unwrap(),
            Some(plain)
        );
    });
}
