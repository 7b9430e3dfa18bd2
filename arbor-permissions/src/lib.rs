// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission inheritance and propagation over nested page trees.
//!
//! Pages of a space form a tree. Every page carries a permission set: one grant per assignee
//! (a user, a role, all members of the space, or the public) with a [`PermissionLevel`]. Grants
//! are either authored on the page itself ("local") or inherited from an ancestor or the space
//! defaults.
//!
//! Inherited grants are materialised on every page and always point straight at the local grant
//! they originate from, never at an intermediate copy. This makes the important operations cheap:
//!
//! - deciding what a user may do on a page looks at that page's grants only,
//! - changing or removing a source grant finds all of its copies with one lookup.
//!
//! ## Building blocks
//!
//! - [`resolver`]: grants a new page inherits from its parent or the space defaults,
//! - [`propagation`]: applies level changes and deletions of a source grant to its copies,
//! - [`reconcile`]: re-derives the inherited grants of a whole subtree after moves or overrides,
//! - [`compute`]: effective level and operations of a user on a page,
//! - [`audit`]: reports broken invariants in stored state.
//!
//! [`Permissions`] ties them together and runs every change as one store transaction.
//!
//! ```rust
//! # use arbor_core::{Assignee, PermissionLevel, SpaceId, UserId};
//! # use arbor_permissions::{Config, NewPage, Permissions};
//! # use arbor_store::MemoryStore;
//! # async fn run() -> Result<(), arbor_permissions::PermissionError<arbor_store::MemoryError>> {
//! let permissions = Permissions::new(MemoryStore::new(), Config::default());
//! let space_id = SpaceId::random();
//! let user_id = UserId::random();
//!
//! let page = permissions.create_page(NewPage::root(space_id)).await?;
//! permissions
//!     .upsert_grant(&page.id, Assignee::User(user_id), PermissionLevel::Editor)
//!     .await?;
//!
//! let level = permissions.compute_effective(&page.id, Some(user_id)).await?;
//! assert_eq!(level, Some(PermissionLevel::Editor));
//! # Ok(())
//! # }
//! ```
//!
//! [`PermissionLevel`]: arbor_core::PermissionLevel
pub mod audit;
pub mod compute;
mod config;
mod error;
pub mod propagation;
pub mod reconcile;
pub mod resolver;
mod service;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use audit::Violation;
pub use config::{Config, DEFAULT_MAX_DEPTH};
pub use error::PermissionError;
pub use propagation::ChangeKind;
pub use service::{NewPage, Permissions};
