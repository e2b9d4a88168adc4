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

//! Records of what the enforcers did during one pass.

use lumen_core::{NetworkProfile, TabId, TaskId};
use std::fmt;
use std::time::Duration;

/// A single corrective action taken by an enforcer.
#[derive(Debug, Clone, PartialEq)]
pub enum EnforcementAction {
    /// Caches were cleared.
    CachesCleared {
        /// Why.
        reason: String,
    },
    /// Background tabs were unloaded, oldest first.
    TabsUnloaded {
        /// Tabs selected.
        ids: Vec<TabId>,
    },
    /// A garbage-collection pass was requested.
    GarbageCollectionRequested,
    /// The user was warned.
    UserWarned {
        /// The warning text.
        message: String,
    },
    /// A tab was suspended.
    TabSuspended {
        /// The tab.
        id: TabId,
        /// Memory expected to be freed, in megabytes.
        estimated_freed_mb: f64,
    },
    /// A tab was discarded.
    TabDiscarded {
        /// The tab.
        id: TabId,
    },
    /// A task was paused.
    TaskPaused {
        /// The task.
        id: TaskId,
    },
    /// A task was resumed.
    TaskResumed {
        /// The task.
        id: TaskId,
    },
    /// A network profile's settings were pushed.
    NetworkProfileApplied {
        /// The profile.
        profile: NetworkProfile,
    },
    /// Image quality was set.
    ImageQualitySet {
        /// Quality, 0 to 100.
        percent: u8,
    },
    /// Video autoplay was toggled.
    VideoAutoplaySet {
        /// New flag.
        enabled: bool,
    },
    /// Animations were toggled.
    AnimationsSet {
        /// New flag.
        enabled: bool,
    },
    /// The cross-process timeout was set.
    IpcTimeoutSet {
        /// New timeout.
        timeout: Duration,
    },
}

impl fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementAction::CachesCleared { reason } => write!(f, "cleared caches ({reason})"),
            EnforcementAction::TabsUnloaded { ids } => {
                write!(f, "unloaded {} background tab(s)", ids.len())
            }
            EnforcementAction::GarbageCollectionRequested => f.write_str("requested gc"),
            EnforcementAction::UserWarned { message } => write!(f, "warned user: {message}"),
            EnforcementAction::TabSuspended {
                id,
                estimated_freed_mb,
            } => write!(f, "suspended {id} (~{estimated_freed_mb:.0}MB)"),
            EnforcementAction::TabDiscarded { id } => write!(f, "discarded {id}"),
            EnforcementAction::TaskPaused { id } => write!(f, "paused {id}"),
            EnforcementAction::TaskResumed { id } => write!(f, "resumed {id}"),
            EnforcementAction::NetworkProfileApplied { profile } => {
                write!(f, "applied network profile {profile}")
            }
            EnforcementAction::ImageQualitySet { percent } => {
                write!(f, "image quality {percent}%")
            }
            EnforcementAction::VideoAutoplaySet { enabled } => {
                write!(f, "video autoplay {}", on_off(*enabled))
            }
            EnforcementAction::AnimationsSet { enabled } => {
                write!(f, "animations {}", on_off(*enabled))
            }
            EnforcementAction::IpcTimeoutSet { timeout } => {
                write!(f, "ipc timeout {}ms", timeout.as_millis())
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// Aggregated actions of one manager pass. Transient: rebuilt on every call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnforcerActions {
    /// Diagnostic label listing the pressured domains in priority order.
    pub priority: String,
    /// Memory enforcer actions.
    pub memory: Vec<EnforcementAction>,
    /// Tab enforcer actions.
    pub tabs: Vec<EnforcementAction>,
    /// Background-task enforcer actions.
    pub tasks: Vec<EnforcementAction>,
    /// Network enforcer actions.
    pub network: Vec<EnforcementAction>,
}

impl EnforcerActions {
    /// Total number of actions across all domains.
    pub fn len(&self) -> usize {
        self.memory.len() + self.tabs.len() + self.tasks.len() + self.network.len()
    }

    /// `true` if no enforcer did anything.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates every action in execution order (memory, tabs, tasks, network).
    pub fn iter(&self) -> impl Iterator<Item = &EnforcementAction> {
        self.memory
            .iter()
            .chain(self.tabs.iter())
            .chain(self.tasks.iter())
            .chain(self.network.iter())
    }
}

impl fmt::Display for EnforcerActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} action(s)", self.priority, self.len())?;
        for action in self.iter() {
            write!(f, "\n  - {action}")?;
        }
        Ok(())
    }
}
