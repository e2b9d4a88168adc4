// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Browser tab records managed by the tab enforcer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a browser tab, assigned by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

/// Lifecycle state of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabState {
    /// The tab has focus. Never suspended or discarded.
    Active,
    /// The tab is live but not focused.
    #[default]
    Background,
    /// Live content was released; the tab keeps its identity and can be resumed.
    Suspended,
    /// The tab was dropped from the live registry. Terminal.
    Discarded,
}

impl TabState {
    /// `true` if the enforcer may suspend a tab in this state.
    pub fn is_suspendable(self) -> bool {
        self == TabState::Background
    }
}

impl fmt::Display for TabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TabState::Active => "active",
            TabState::Background => "background",
            TabState::Suspended => "suspended",
            TabState::Discarded => "discarded",
        })
    }
}

/// A single tab tracked by the tab registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    /// Host-assigned identifier.
    pub id: TabId,
    /// Current lifecycle state.
    pub state: TabState,
    /// Estimated memory held by the tab's live content, in megabytes.
    pub memory_usage_mb: f64,
    /// Last time the user interacted with the tab (Unix milliseconds).
    pub last_accessed_ms: u64,
    /// Creation time (Unix milliseconds).
    pub created_ms: u64,
}

impl TabRecord {
    /// Creates a record whose creation and last-access times are both `now_ms`.
    pub fn new(id: TabId, state: TabState, memory_usage_mb: f64, now_ms: u64) -> Self {
        Self {
            id,
            state,
            memory_usage_mb,
            last_accessed_ms: now_ms,
            created_ms: now_ms,
        }
    }
}
