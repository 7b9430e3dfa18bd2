// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from its raw bytes representation.
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Bytes of the identifier.
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value)
                    .map(Self)
                    .map_err(|err| IdError::Invalid(stringify!($name), err))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&self.0.hyphenated().to_string())
                    .finish()
            }
        }
    };
}

uuid_id!(
    /// Identifier of a page, board or card.
    PageId
);

uuid_id!(
    /// Identifier of a space (tenant). Every page belongs to exactly one space.
    SpaceId
);

uuid_id!(
    /// Identifier of a user.
    UserId
);

uuid_id!(
    /// Identifier of a role inside a space.
    RoleId
);

uuid_id!(
    /// Identifier of a single permission grant.
    GrantId
);

#[derive(Debug, Error)]
pub enum IdError {
    #[error("invalid {0} string: {1}")]
    Invalid(&'static str, uuid::Error),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{GrantId, PageId};

    #[test]
    fn string_representation() {
        let id = PageId::from_bytes([7; 16]);
        assert_eq!(id.to_string(), "07070707-0707-0707-0707-070707070707");
        assert_eq!(PageId::from_str(&id.to_string()).unwrap(), id);
        assert!(GrantId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn serde_is_transparent() {
        let id = GrantId::from_bytes([1; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"01010101-0101-0101-0101-010101010101\"");
        assert_eq!(serde_json::from_str::<GrantId>(&json).unwrap(), id);
    }
}
