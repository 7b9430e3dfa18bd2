// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces and implementations of persistence layers for page trees, permission grants and
//! space memberships.
//!
//! The permission engine in `arbor-permissions` is written against the traits of this crate only:
//! [`PageStore`] for the page tree, [`GrantStore`] for permission grants, [`MembershipStore`] for
//! users' roles in a space and [`Transaction`] for grouping writes into one atomic unit.
//!
//! ## Write transactions
//!
//! Creating a page together with its inherited grants, or propagating a changed grant to all of
//! its dependents, must strictly _all_ occur or _none_ occur. Every store implementation hence
//! refuses writes outside of a transaction and serializes transactions: while one process holds a
//! permit, every other `begin` waits.
//!
//! Writes go through the handle returned by [`Transaction::transactional`], which also reads the
//! uncommitted state. Other handles keep reading the committed state until the transaction ends.
//!
//! ```rust
//! # use arbor_core::{Page, PageId, SpaceId};
//! # use arbor_store::{MemoryStore, PageStore, Transaction};
//! # async fn run() -> Result<(), arbor_store::MemoryError> {
//! let store = MemoryStore::new();
//! let page = Page::new(PageId::random(), SpaceId::random(), None);
//!
//! let permit = store.begin().await?;
//! store.transactional().insert_page(&page).await?;
//! assert_eq!(store.get_page(&page.id).await?, None);
//! store.commit(permit).await?;
//! assert_eq!(store.get_page(&page.id).await?, Some(page));
//! # Ok(())
//! # }
//! ```
//!
//! ## Store implementations
//!
//! An in-memory store (`MemoryStore`, `memory` feature) and a SQLite store (`SqliteStore`,
//! `sqlite` feature) are provided, both enabled by default.
pub mod grants;
#[cfg(feature = "memory")]
pub mod memory;
pub mod memberships;
pub mod pages;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
mod traits;

pub use grants::GrantStore;
#[cfg(feature = "memory")]
pub use memory::{MemoryError, MemoryStore};
pub use memberships::MembershipStore;
pub use pages::PageStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteError, SqliteStore, SqliteStoreBuilder};
pub use traits::{Transaction, TransactionPermit};
