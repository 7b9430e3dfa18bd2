// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assignee::Assignee;
use crate::identity::{GrantId, IdError, PageId, SpaceId};
use crate::level::PermissionLevel;

/// What a grant decorates.
///
/// Space default permissions are grants on the `SpaceDefaults` resource of a space. They act as
/// the synthetic top of every page tree in that space: root pages inherit from them exactly like
/// child pages inherit from their parent.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Resource {
    Page(PageId),
    SpaceDefaults(SpaceId),
}

impl Resource {
    /// Returns the page id if this resource is a page.
    pub fn page_id(&self) -> Option<PageId> {
        match self {
            Resource::Page(id) => Some(*id),
            Resource::SpaceDefaults(_) => None,
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Page(id) => write!(f, "page:{id}"),
            Resource::SpaceDefaults(id) => write!(f, "space:{id}"),
        }
    }
}

impl FromStr for Resource {
    type Err = ResourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some(("page", id)) => Ok(Resource::Page(id.parse()?)),
            Some(("space", id)) => Ok(Resource::SpaceDefaults(id.parse()?)),
            _ => Err(ResourceError::Malformed(value.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("malformed resource '{0}'")]
    Malformed(String),

    #[error(transparent)]
    Id(#[from] IdError),
}

/// Where a grant comes from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "from", rename_all = "snake_case")]
pub enum GrantSource {
    /// Authored on this resource. Local grants are the only valid inheritance sources.
    Local,

    /// Copied from the given source grant, which is always a `Local` grant on a strict ancestor
    /// or on the space defaults.
    Inherited(GrantId),
}

/// A single (resource, assignee, level) permission record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,
    pub resource: Resource,
    pub assignee: Assignee,
    pub level: PermissionLevel,
    pub source: GrantSource,
}

impl Grant {
    /// Create a locally authored grant with a fresh identifier.
    pub fn local(resource: Resource, assignee: Assignee, level: PermissionLevel) -> Self {
        Self {
            id: GrantId::random(),
            resource,
            assignee,
            level,
            source: GrantSource::Local,
        }
    }

    /// Create a grant on `resource` copying assignee and level from `grant`.
    ///
    /// The copy points at the authoritative source of `grant`, never at `grant` itself when that
    /// one is already a copy.
    pub fn inherit(resource: Resource, grant: &Grant) -> Self {
        Self {
            id: GrantId::random(),
            resource,
            assignee: grant.assignee,
            level: grant.level,
            source: GrantSource::Inherited(grant.origin()),
        }
    }

    /// Id of the grant a copy of this grant must reference.
    pub fn origin(&self) -> GrantId {
        match self.source {
            GrantSource::Local => self.id,
            GrantSource::Inherited(source) => source,
        }
    }

    pub fn inherited_from(&self) -> Option<GrantId> {
        match self.source {
            GrantSource::Local => None,
            GrantSource::Inherited(source) => Some(source),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, GrantSource::Local)
    }

    pub fn page_id(&self) -> Option<PageId> {
        self.resource.page_id()
    }
}
