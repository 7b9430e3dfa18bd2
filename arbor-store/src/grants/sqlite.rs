// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::{Assignee, Grant, GrantId, GrantSource, PermissionLevel, Resource};
use sqlx::{FromRow, query, query_as};

use crate::grants::GrantStore;
use crate::sqlite::{SqliteError, SqliteStore, decode};

/// A single grant row as it is inserted in the database.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
struct GrantRow {
    id: String,
    resource: String,
    assignee: String,
    level: String,
    inherited_from: Option<String>,
}

impl TryFrom<GrantRow> for Grant {
    type Error = SqliteError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let source = match row.inherited_from {
            Some(source) => GrantSource::Inherited(decode::<GrantId>(&source, "inherited_from")?),
            None => GrantSource::Local,
        };

        Ok(Grant {
            id: decode::<GrantId>(&row.id, "id")?,
            resource: decode::<Resource>(&row.resource, "resource")?,
            assignee: decode::<Assignee>(&row.assignee, "assignee")?,
            level: decode::<PermissionLevel>(&row.level, "level")?,
            source,
        })
    }
}

impl<'a> GrantStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn get_grant(&self, id: &GrantId) -> Result<Option<Grant>, Self::Error> {
        let row = self
            .read(async |conn| {
                query_as::<_, GrantRow>(
                    "
                    SELECT
                        id,
                        resource,
                        assignee,
                        level,
                        inherited_from
                    FROM
                        grants_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(id.to_string())
                .fetch_optional(&mut *conn)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        row.map(Grant::try_from).transpose()
    }

    async fn find_by_resource(&self, resource: &Resource) -> Result<Vec<Grant>, Self::Error> {
        let rows = self
            .read(async |conn| {
                query_as::<_, GrantRow>(
                    "
                    SELECT
                        id,
                        resource,
                        assignee,
                        level,
                        inherited_from
                    FROM
                        grants_v1
                    WHERE
                        resource = ?
                    ORDER BY
                        id
                    ",
                )
                .bind(resource.to_string())
                .fetch_all(&mut *conn)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(Grant::try_from).collect()
    }

    async fn find_by_inherited_from(&self, source: &GrantId) -> Result<Vec<Grant>, Self::Error> {
        let rows = self
            .read(async |conn| {
                query_as::<_, GrantRow>(
                    "
                    SELECT
                        id,
                        resource,
                        assignee,
                        level,
                        inherited_from
                    FROM
                        grants_v1
                    WHERE
                        inherited_from = ?
                    ORDER BY
                        id
                    ",
                )
                .bind(source.to_string())
                .fetch_all(&mut *conn)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(Grant::try_from).collect()
    }

    async fn insert_grant(&self, grant: &Grant) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                // Ignore insertion when the id or the (resource, assignee) pair already exists
                // (UNIQUE constraints).
                query(
                    "
                    INSERT OR IGNORE
                    INTO
                        grants_v1 (
                            id,
                            resource,
                            assignee,
                            level,
                            inherited_from
                        )
                    VALUES
                        (?, ?, ?, ?, ?)
                    ",
                )
                .bind(grant.id.to_string())
                .bind(grant.resource.to_string())
                .bind(grant.assignee.to_string())
                .bind(grant.level.as_str())
                .bind(grant.inherited_from().map(|id| id.to_string()))
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_grant(&self, grant: &Grant) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    UPDATE
                        grants_v1
                    SET
                        level = ?,
                        inherited_from = ?
                    WHERE
                        id = ?
                    ",
                )
                .bind(grant.level.as_str())
                .bind(grant.inherited_from().map(|id| id.to_string()))
                .bind(grant.id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_grant(&self, id: &GrantId) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    DELETE
                    FROM
                        grants_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
