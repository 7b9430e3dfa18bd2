// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data types shared by the arbor permission engine and its storage backends.
//!
//! Pages form a strict tree inside a space. Every page carries a set of permission [`Grant`]s,
//! each giving one [`Assignee`] (a user, a role, the whole space or the public) a
//! [`PermissionLevel`] on that page.
//!
//! Grants are either authored directly on a resource ([`GrantSource::Local`]) or copied from an
//! authoritative source grant ([`GrantSource::Inherited`]). Copies always point at the original
//! source, never at an intermediate copy, which keeps inheritance flat no matter how deep the page
//! tree grows.
mod assignee;
mod grant;
mod identity;
mod level;
mod membership;
mod page;

pub use assignee::{Assignee, AssigneeError};
pub use grant::{Grant, GrantSource, Resource, ResourceError};
pub use identity::{GrantId, IdError, PageId, RoleId, SpaceId, UserId};
pub use level::{LevelError, PageOperation, PageOperations, PermissionLevel};
pub use membership::SpaceMembership;
pub use page::Page;
