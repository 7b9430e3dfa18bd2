// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::{Page, PageId, SpaceId};
use sqlx::{FromRow, query, query_as};

use crate::pages::PageStore;
use crate::sqlite::{SqliteError, SqliteStore, decode};

/// A single page row as it is inserted in the database.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
struct PageRow {
    id: String,
    space_id: String,
    parent_id: Option<String>,
}

impl TryFrom<PageRow> for Page {
    type Error = SqliteError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        Ok(Page {
            id: decode::<PageId>(&row.id, "id")?,
            space_id: decode::<SpaceId>(&row.space_id, "space_id")?,
            parent_id: row
                .parent_id
                .map(|parent_id| decode::<PageId>(&parent_id, "parent_id"))
                .transpose()?,
        })
    }
}

impl<'a> PageStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_page(&self, page: &Page) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    INSERT OR IGNORE
                    INTO
                        pages_v1 (
                            id,
                            space_id,
                            parent_id
                        )
                    VALUES
                        (?, ?, ?)
                    ",
                )
                .bind(page.id.to_string())
                .bind(page.space_id.to_string())
                .bind(page.parent_id.map(|id| id.to_string()))
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_page(&self, id: &PageId) -> Result<Option<Page>, Self::Error> {
        let row = self
            .read(async |conn| {
                query_as::<_, PageRow>(
                    "
                    SELECT
                        id,
                        space_id,
                        parent_id
                    FROM
                        pages_v1
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

        row.map(Page::try_from).transpose()
    }

    async fn get_children(&self, id: &PageId) -> Result<Vec<PageId>, Self::Error> {
        let rows: Vec<(String,)> = self
            .read(async |conn| {
                query_as(
                    "
                    SELECT
                        id
                    FROM
                        pages_v1
                    WHERE
                        parent_id = ?
                    ORDER BY
                        id
                    ",
                )
                .bind(id.to_string())
                .fetch_all(&mut *conn)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.iter().map(|(id,)| decode::<PageId>(id, "id")).collect()
    }

    async fn set_parent(
        &self,
        id: &PageId,
        parent_id: Option<PageId>,
    ) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    UPDATE
                        pages_v1
                    SET
                        parent_id = ?
                    WHERE
                        id = ?
                    ",
                )
                .bind(parent_id.map(|id| id.to_string()))
                .bind(id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_page(&self, id: &PageId) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    DELETE
                    FROM
                        pages_v1
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

    async fn list_pages(&self, space_id: &SpaceId) -> Result<Vec<Page>, Self::Error> {
        let rows = self
            .read(async |conn| {
                query_as::<_, PageRow>(
                    "
                    SELECT
                        id,
                        space_id,
                        parent_id
                    FROM
                        pages_v1
                    WHERE
                        space_id = ?
                    ORDER BY
                        id
                    ",
                )
                .bind(space_id.to_string())
                .fetch_all(&mut *conn)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(Page::try_from).collect()
    }
}
