// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{IdError, RoleId, SpaceId, UserId};

/// The target of a grant.
///
/// A page holds at most one grant per assignee.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "group", content = "id", rename_all = "snake_case")]
pub enum Assignee {
    /// A single user.
    User(UserId),

    /// Every user holding this role in the space.
    Role(RoleId),

    /// Every member of the space.
    Space(SpaceId),

    /// Anyone, including anonymous visitors.
    Public,
}

impl Assignee {
    pub fn is_public(&self) -> bool {
        matches!(self, Assignee::Public)
    }
}

impl Display for Assignee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assignee::User(id) => write!(f, "user:{id}"),
            Assignee::Role(id) => write!(f, "role:{id}"),
            Assignee::Space(id) => write!(f, "space:{id}"),
            Assignee::Public => write!(f, "public"),
        }
    }
}

impl FromStr for Assignee {
    type Err = AssigneeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "public" {
            return Ok(Assignee::Public);
        }

        let Some((group, id)) = value.split_once(':') else {
            return Err(AssigneeError::Malformed(value.to_string()));
        };

        match group {
            "user" => Ok(Assignee::User(id.parse()?)),
            "role" => Ok(Assignee::Role(id.parse()?)),
            "space" => Ok(Assignee::Space(id.parse()?)),
            _ => Err(AssigneeError::Malformed(value.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssigneeError {
    #[error("malformed assignee '{0}'")]
    Malformed(String),

    #[error(transparent)]
    Id(#[from] IdError),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{RoleId, SpaceId, UserId};

    use super::Assignee;

    #[test]
    fn string_representation() {
        let assignees = [
            Assignee::User(UserId::random()),
            Assignee::Role(RoleId::random()),
            Assignee::Space(SpaceId::random()),
            Assignee::Public,
        ];

        for assignee in assignees {
            assert_eq!(Assignee::from_str(&assignee.to_string()).unwrap(), assignee);
        }

        assert!(Assignee::from_str("group:123").is_err());
        assert!(Assignee::from_str("user:123").is_err());
        assert!(Assignee::from_str("anyone").is_err());
    }
}
