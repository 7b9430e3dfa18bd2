// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The levels of access a grant can give on a page. Greater levels contain all lower ones.
///
/// "No access" is not a level, it is expressed as the absence of one (`None`), which orders below
/// every `Some(level)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Permission to read a page.
    View,

    /// Permission to read and comment on a page.
    ViewComment,

    /// Permission to edit, move and delete a page.
    Editor,

    /// Everything, including managing who else has access.
    FullAccess,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::View,
        PermissionLevel::ViewComment,
        PermissionLevel::Editor,
        PermissionLevel::FullAccess,
    ];

    /// Operations unlocked by this level.
    pub fn operations(&self) -> PageOperations {
        use PageOperation::*;

        let operations: &[PageOperation] = match self {
            PermissionLevel::View => &[Read],
            PermissionLevel::ViewComment => &[Read, Comment],
            PermissionLevel::Editor => &[
                Read,
                Comment,
                EditContent,
                EditPosition,
                Delete,
                CreatePoll,
            ],
            PermissionLevel::FullAccess => &[
                Read,
                Comment,
                EditContent,
                EditPosition,
                Delete,
                CreatePoll,
                GrantPermissions,
            ],
        };

        PageOperations(operations.iter().copied().collect())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::View => "view",
            PermissionLevel::ViewComment => "view_comment",
            PermissionLevel::Editor => "editor",
            PermissionLevel::FullAccess => "full_access",
        }
    }
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = LevelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PermissionLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == value)
            .ok_or_else(|| LevelError::Unknown(value.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("unknown permission level '{0}'")]
    Unknown(String),
}

/// Single action a user can take on a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOperation {
    Read,
    Comment,
    EditContent,
    EditPosition,
    Delete,
    CreatePoll,
    GrantPermissions,
}

/// Set of operations a user may perform on a page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOperations(BTreeSet<PageOperation>);

impl PageOperations {
    /// No operations at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, operation: PageOperation) -> bool {
        self.0.contains(&operation)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageOperation> {
        self.0.iter()
    }
}

impl From<Option<PermissionLevel>> for PageOperations {
    fn from(level: Option<PermissionLevel>) -> Self {
        level.map(|level| level.operations()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{PageOperation, PageOperations, PermissionLevel};

    #[test]
    fn total_order() {
        assert!(PermissionLevel::View < PermissionLevel::ViewComment);
        assert!(PermissionLevel::ViewComment < PermissionLevel::Editor);
        assert!(PermissionLevel::Editor < PermissionLevel::FullAccess);

        // Having no access at all is lower than any level.
        assert!(None < Some(PermissionLevel::View));
        assert_eq!(
            [Some(PermissionLevel::Editor), None, Some(PermissionLevel::View)]
                .into_iter()
                .max(),
            Some(Some(PermissionLevel::Editor))
        );
    }

    #[test]
    fn higher_levels_contain_lower_operations() {
        for pair in PermissionLevel::ALL.windows(2) {
            let lower = pair[0].operations();
            let higher = pair[1].operations();
            assert!(lower.iter().all(|op| higher.contains(*op)));
        }

        let editor = PermissionLevel::Editor.operations();
        assert!(editor.contains(PageOperation::Delete));
        assert!(!editor.contains(PageOperation::GrantPermissions));
        assert!(
            PermissionLevel::FullAccess
                .operations()
                .contains(PageOperation::GrantPermissions)
        );
        assert!(PageOperations::from(None).is_empty());
    }

    #[test]
    fn string_representation() {
        for level in PermissionLevel::ALL {
            assert_eq!(PermissionLevel::from_str(&level.to_string()).unwrap(), level);
        }
        assert!(PermissionLevel::from_str("owner").is_err());
    }
}
