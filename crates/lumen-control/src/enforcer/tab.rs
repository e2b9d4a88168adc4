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

//! Tab enforcer: suspends old background tabs and, as a last resort, discards
//! old suspended ones.

use super::{BusyFlag, EnforcerOutputs};
use crate::actions::EnforcementAction;
use crate::policy::MemoryPolicy;
use crate::registry::{self, SharedTabRegistry, TabCounts};
use lumen_core::clock::unix_millis;
use lumen_core::event::EnforcementEvent;
use lumen_core::{MemoryStatus, TabId, TabRecord, TabState};

/// Usage above `target × DISCARD_MARGIN` after suspensions triggers discards.
pub const DISCARD_MARGIN: f64 = 1.1;

/// Owns the tab lifecycle on the engine side.
pub struct TabEnforcer {
    tabs: SharedTabRegistry,
    policy: MemoryPolicy,
    outputs: EnforcerOutputs,
    busy: BusyFlag,
}

impl TabEnforcer {
    /// Creates an enforcer over `tabs`, sized by the memory policy's settings.
    pub fn new(tabs: SharedTabRegistry, policy: MemoryPolicy, outputs: EnforcerOutputs) -> Self {
        Self {
            tabs,
            policy,
            outputs,
            busy: BusyFlag::new(),
        }
    }

    /// Shared handle to the registry.
    pub fn registry(&self) -> SharedTabRegistry {
        SharedTabRegistry::clone(&self.tabs)
    }

    /// Starts tracking a tab.
    pub fn register_tab(&self, record: TabRecord) {
        registry::write(&self.tabs).register(record);
    }

    /// Marks a tab as focused. Suspended tabs must be resumed instead.
    pub fn focus(&self, id: TabId) -> bool {
        registry::write(&self.tabs).activate(id, unix_millis())
    }

    /// Marks a focused tab as background.
    pub fn blur(&self, id: TabId) -> bool {
        registry::write(&self.tabs).deactivate(id)
    }

    /// Stops tracking a closed tab.
    pub fn close(&self, id: TabId) -> Option<TabRecord> {
        registry::write(&self.tabs).remove(id)
    }

    /// Updates a tab's memory estimate.
    pub fn update_memory(&self, id: TabId, memory_usage_mb: f64) -> bool {
        registry::write(&self.tabs).update_memory(id, memory_usage_mb)
    }

    /// Makes a tab active again and refreshes its last access time.
    ///
    /// A suspended tab is also brought back through the actuation channel.
    /// Unknown ids are ignored.
    pub fn resume(&self, id: TabId) -> bool {
        let mut tabs = registry::write(&self.tabs);
        let Some(tab) = tabs.get_mut(id) else {
            log::debug!("TabEnforcer: resume of unknown {id} ignored");
            return false;
        };
        let was_suspended = tab.state == TabState::Suspended;
        tab.state = TabState::Active;
        tab.last_accessed_ms = tab.last_accessed_ms.max(unix_millis());
        drop(tabs);

        if was_suspended {
            log::debug!("TabEnforcer: resumed {id}");
            self.outputs.channel.resume_tab(id);
            self.outputs
                .events
                .publish(EnforcementEvent::TabResumed { id });
        }
        true
    }

    /// Copy of every tracked tab, in id order.
    pub fn tabs(&self) -> Vec<TabRecord> {
        registry::read(&self.tabs).iter().cloned().collect()
    }

    /// Tab counts per state.
    pub fn counts(&self) -> TabCounts {
        registry::read(&self.tabs).counts()
    }

    /// Frees memory according to `status`.
    ///
    /// Suspends the least recently used background tabs, up to the tier's
    /// batch, until the estimated freed memory covers `current_mb −
    /// target_mb`. At the critical and emergency tiers, if usage minus the
    /// freed estimate stays above `1.1 × target_mb`, the oldest suspended tabs
    /// (by creation) are discarded. Tabs suspended by this same call are never
    /// discarded by it.
    pub fn optimize(
        &self,
        status: MemoryStatus,
        current_mb: f64,
        target_mb: f64,
    ) -> Vec<EnforcementAction> {
        let Some(_guard) = self.busy.try_enter() else {
            log::debug!("TabEnforcer: busy, skipping pass");
            return Vec::new();
        };

        let settings = self.policy.settings_for(status);
        let mut actions = Vec::new();
        if settings.suspend_batch == 0 && settings.discard_batch == 0 {
            return actions;
        }

        let gap_mb = current_mb - target_mb;
        let mut freed_mb = 0.0;
        let mut tabs = registry::write(&self.tabs);

        let mut suspended_now = Vec::new();
        for id in tabs.background_by_last_access() {
            if suspended_now.len() >= settings.suspend_batch || freed_mb >= gap_mb {
                break;
            }
            let Some(tab) = tabs.get_mut(id) else {
                continue;
            };
            tab.state = TabState::Suspended;
            let estimated_freed_mb = tab.memory_usage_mb;
            freed_mb += estimated_freed_mb;
            suspended_now.push(id);

            self.outputs.channel.suspend_tab(id);
            self.outputs.events.publish(EnforcementEvent::TabSuspended {
                id,
                estimated_freed_mb,
            });
            actions.push(EnforcementAction::TabSuspended {
                id,
                estimated_freed_mb,
            });
        }

        let escalated = matches!(status, MemoryStatus::Critical | MemoryStatus::Emergency);
        if escalated && current_mb - freed_mb > DISCARD_MARGIN * target_mb {
            let victims: Vec<TabId> = tabs
                .suspended_by_creation()
                .into_iter()
                .filter(|id| !suspended_now.contains(id))
                .take(settings.discard_batch)
                .collect();
            for id in victims {
                tabs.remove(id);
                log::info!("TabEnforcer: discarded {id}");
                self.outputs.channel.discard_tab(id);
                self.outputs
                    .events
                    .publish(EnforcementEvent::TabDiscarded { id });
                actions.push(EnforcementAction::TabDiscarded { id });
            }
        }

        log::debug!(
            "TabEnforcer: {} at {:.0}MB (target {:.0}MB), freed ~{:.0}MB, {} action(s)",
            status,
            current_mb,
            target_mb,
            freed_mb,
            actions.len()
        );
        actions
    }
}
