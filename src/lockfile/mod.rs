//! Lock file (`.bz.lock`) model.
//!
//! The lock file records the outcome of resolving a fuzzy config: every
//! dependency pinned to one exact version, plus the directory's own bin dir,
//! exports, aliases and triggers. It is pretty-printed JSON with camelCase
//! keys, and empty fields are left out:
//!
//! ```json
//! {
//!   "binDir": "$DIR/tools",
//!   "deps": [
//!     { "server": "github.com", "owner": "acme", "repo": "tool", "version": "1.2.3" }
//!   ],
//!   "env": { "TOOL_HOME": "$DIR" },
//!   "alias": { "build": "tool build" },
//!   "triggers": { "installScript": "./install.sh" }
//! }
//! ```
//!
//! Released dependencies ship their own `.bz.lock` at the archive root; it is
//! how the resolver discovers transitive dependencies.

mod io;

use crate::config::{FuzzyConfigContent, Triggers};
use crate::coord::LockedCoord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A directory's config with every dependency pinned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LockedConfigContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<LockedCoord>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub alias: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Triggers::is_empty")]
    pub triggers: Triggers,
}

impl LockedConfigContent {
    /// Carries over everything from a fuzzy config except its dependency
    /// strings, which are replaced by `deps`.
    #[must_use]
    pub fn from_fuzzy(fuzzy: FuzzyConfigContent, deps: Vec<LockedCoord>) -> Self {
        Self {
            bin_dir: fuzzy.bin_dir.filter(|b| !b.is_empty()),
            deps,
            env: fuzzy.env,
            alias: fuzzy.alias,
            triggers: fuzzy.triggers,
        }
    }
}
