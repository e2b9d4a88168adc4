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

//! Typed events emitted by the enforcers.

mod bus;

pub use bus::EventBus;

use crate::status::{MemoryStatus, NetworkProfile};
use crate::tab::TabId;
use crate::task::TaskId;

/// Something an enforcer did, or observed, while applying policy.
#[derive(Debug, Clone, PartialEq)]
pub enum EnforcementEvent {
    /// The memory tier changed between two enforcement passes.
    MemoryStatusChanged {
        /// Tier of the previous pass.
        previous: MemoryStatus,
        /// Tier of this pass.
        current: MemoryStatus,
        /// Usage that produced `current`, in megabytes.
        used_mb: f64,
    },
    /// A cache clear was requested.
    CachesCleared {
        /// Why the caches are being cleared.
        reason: String,
    },
    /// An unload of background tabs was requested.
    TabsUnloadRequested {
        /// Tabs selected for unloading.
        ids: Vec<TabId>,
    },
    /// A garbage-collection pass was requested.
    GarbageCollectionRequested,
    /// A warning was raised to the user.
    UserWarned {
        /// The warning text.
        message: String,
    },
    /// A tab was suspended.
    TabSuspended {
        /// The suspended tab.
        id: TabId,
        /// Memory the suspension is expected to free, in megabytes.
        estimated_freed_mb: f64,
    },
    /// A suspended tab was resumed.
    TabResumed {
        /// The resumed tab.
        id: TabId,
    },
    /// A tab was discarded and removed from the registry.
    TabDiscarded {
        /// The discarded tab.
        id: TabId,
    },
    /// A running task was paused.
    TaskPaused {
        /// The paused task.
        id: TaskId,
    },
    /// A paused task was resumed.
    TaskResumed {
        /// The resumed task.
        id: TaskId,
    },
    /// New network settings were pushed.
    NetworkProfileChanged {
        /// Profile applied before, if any.
        previous: Option<NetworkProfile>,
        /// Profile applied now.
        current: NetworkProfile,
        /// Round-trip time that triggered the change.
        rtt_ms: f64,
    },
}
