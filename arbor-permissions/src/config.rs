// SPDX-License-Identifier: MIT OR Apache-2.0

use arbor_core::PermissionLevel;
use serde::{Deserialize, Serialize};

/// Maximum number of ancestors walked before a page tree is considered cyclic.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Configuration of the permission engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Highest level a `Public` grant may carry.
    pub public_level_cap: PermissionLevel,

    /// Space admins get full access to every page of their space, regardless of grants.
    pub admin_full_access: bool,

    /// Upper bound of ancestors walked when checking moves for cycles.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_level_cap: PermissionLevel::View,
            admin_full_access: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use arbor_core::PermissionLevel;

    use super::Config;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{ "admin_full_access": false }"#).unwrap();
        assert!(!config.admin_full_access);
        assert_eq!(config.public_level_cap, PermissionLevel::View);
        assert_eq!(config.max_depth, Config::default().max_depth);
    }
}
