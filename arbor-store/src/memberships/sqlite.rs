// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use arbor_core::{RoleId, SpaceId, SpaceMembership, UserId};
use sqlx::{query, query_as};

use crate::memberships::MembershipStore;
use crate::sqlite::{SqliteError, SqliteStore, decode};

impl<'a> MembershipStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn membership(
        &self,
        user_id: &UserId,
        space_id: &SpaceId,
    ) -> Result<Option<SpaceMembership>, Self::Error> {
        let row: Option<((bool,), Vec<(String,)>)> = self
            .read(async |conn| {
                let membership: Option<(bool,)> = query_as(
                    "
                    SELECT
                        is_admin
                    FROM
                        memberships_v1
                    WHERE
                        user_id = ?
                        AND space_id = ?
                    ",
                )
                .bind(user_id.to_string())
                .bind(space_id.to_string())
                .fetch_optional(&mut *conn)
                .await?;

                let Some(membership) = membership else {
                    return Ok(None);
                };

                let roles: Vec<(String,)> = query_as(
                    "
                    SELECT
                        role_id
                    FROM
                        membership_roles_v1
                    WHERE
                        user_id = ?
                        AND space_id = ?
                    ",
                )
                .bind(user_id.to_string())
                .bind(space_id.to_string())
                .fetch_all(&mut *conn)
                .await?;

                Ok(Some((membership, roles)))
            })
            .await?;

        let Some(((is_admin,), roles)) = row else {
            return Ok(None);
        };

        let roles = roles
            .iter()
            .map(|(role_id,)| decode::<RoleId>(role_id, "role_id"))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Some(SpaceMembership {
            user_id: *user_id,
            space_id: *space_id,
            is_admin,
            roles,
        }))
    }

    async fn set_membership(&self, membership: &SpaceMembership) -> Result<bool, Self::Error> {
        self.tx(async |tx| {
            let user_id = membership.user_id.to_string();
            let space_id = membership.space_id.to_string();

            let existing: Option<(bool,)> = query_as(
                "
                SELECT
                    is_admin
                FROM
                    memberships_v1
                WHERE
                    user_id = ?
                    AND space_id = ?
                ",
            )
            .bind(user_id.as_str())
            .bind(space_id.as_str())
            .fetch_optional(&mut **tx)
            .await?;

            query(
                "
                INSERT
                INTO
                    memberships_v1 (
                        user_id,
                        space_id,
                        is_admin
                    )
                VALUES
                    (?, ?, ?)
                ON CONFLICT (user_id, space_id) DO UPDATE SET
                    is_admin = excluded.is_admin
                ",
            )
            .bind(user_id.as_str())
            .bind(space_id.as_str())
            .bind(membership.is_admin)
            .execute(&mut **tx)
            .await?;

            // Roles are replaced as a whole.
            query(
                "
                DELETE
                FROM
                    membership_roles_v1
                WHERE
                    user_id = ?
                    AND space_id = ?
                ",
            )
            .bind(user_id.as_str())
            .bind(space_id.as_str())
            .execute(&mut **tx)
            .await?;

            for role_id in &membership.roles {
                query(
                    "
                    INSERT
                    INTO
                        membership_roles_v1 (
                            user_id,
                            space_id,
                            role_id
                        )
                    VALUES
                        (?, ?, ?)
                    ",
                )
                .bind(user_id.as_str())
                .bind(space_id.as_str())
                .bind(role_id.to_string())
                .execute(&mut **tx)
                .await?;
            }

            Ok(existing.is_none())
        })
        .await
    }

    async fn remove_membership(
        &self,
        user_id: &UserId,
        space_id: &SpaceId,
    ) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    DELETE
                    FROM
                        membership_roles_v1
                    WHERE
                        user_id = ?
                        AND space_id = ?
                    ",
                )
                .bind(user_id.to_string())
                .bind(space_id.to_string())
                .execute(&mut **tx)
                .await?;

                query(
                    "
                    DELETE
                    FROM
                        memberships_v1
                    WHERE
                        user_id = ?
                        AND space_id = ?
                    ",
                )
                .bind(user_id.to_string())
                .bind(space_id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
