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

//! Memory enforcer: caches, background tab unloading, GC and user warnings.

use super::{BusyFlag, EnforcerOutputs};
use crate::actions::EnforcementAction;
use crate::policy::MemoryPolicy;
use crate::registry::{self, SharedTabRegistry};
use lumen_core::event::EnforcementEvent;
use lumen_core::platform::NotificationSink;
use lumen_core::{MemoryStatus, TabId};
use std::sync::{Arc, Mutex, PoisonError};

/// Megabytes over the critical threshold that add one tab to the unload batch.
const UNLOAD_STEP_MB: f64 = 30.0;

/// Unload batch for `current_mb` at the critical tier, in `[1, 5]`.
pub(crate) fn critical_unload_batch(current_mb: f64, critical_mb: f64) -> usize {
    let over = ((current_mb - critical_mb) / UNLOAD_STEP_MB).ceil();
    if over.is_nan() {
        return 1;
    }
    (over.max(0.0) as usize).clamp(1, 5)
}

/// Unload batch for `current_mb` at the emergency tier, in `[3, 10]`.
pub(crate) fn emergency_unload_batch(current_mb: f64, critical_mb: f64) -> usize {
    (critical_unload_batch(current_mb, critical_mb) * 2).clamp(3, 10)
}

/// Applies the memory policy.
///
/// The enforcer reads the shared tab registry to pick unload candidates but
/// never changes tab states: an unload only releases renderer content, and
/// the tab enforcer owns state transitions.
pub struct MemoryEnforcer {
    policy: MemoryPolicy,
    tabs: SharedTabRegistry,
    outputs: EnforcerOutputs,
    sink: Arc<dyn NotificationSink>,
    last_status: Mutex<MemoryStatus>,
    busy: BusyFlag,
}

impl MemoryEnforcer {
    /// Creates an enforcer in the healthy state.
    pub fn new(
        policy: MemoryPolicy,
        tabs: SharedTabRegistry,
        outputs: EnforcerOutputs,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            policy,
            tabs,
            outputs,
            sink,
            last_status: Mutex::new(MemoryStatus::Healthy),
            busy: BusyFlag::new(),
        }
    }

    /// The policy this enforcer applies.
    pub fn policy(&self) -> &MemoryPolicy {
        &self.policy
    }

    /// Tier observed by the last completed pass.
    pub fn last_status(&self) -> MemoryStatus {
        *self.last_status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Classifies `current_mb` and issues the corrective requests of its tier.
    pub fn enforce(&self, current_mb: f64) -> Vec<EnforcementAction> {
        let Some(_guard) = self.busy.try_enter() else {
            log::debug!("MemoryEnforcer: busy, skipping pass");
            return Vec::new();
        };

        let evaluation = self.policy.evaluate(current_mb);
        let status = evaluation.status;
        self.record_status(status, current_mb);

        let critical_mb = self.policy.thresholds().critical_mb;
        let mut actions = Vec::new();
        match status {
            MemoryStatus::Healthy => {}
            MemoryStatus::Warning => {
                self.clear_caches("memory warning", &mut actions);
            }
            MemoryStatus::Critical => {
                self.clear_caches("memory critical", &mut actions);
                let batch = critical_unload_batch(current_mb, critical_mb);
                self.unload_oldest(batch, &mut actions);
            }
            MemoryStatus::Emergency => {
                self.clear_caches("memory emergency", &mut actions);
                let batch = emergency_unload_batch(current_mb, critical_mb);
                self.unload_oldest(batch, &mut actions);

                self.outputs.channel.trigger_gc();
                self.outputs
                    .events
                    .publish(EnforcementEvent::GarbageCollectionRequested);
                actions.push(EnforcementAction::GarbageCollectionRequested);

                let message = format!(
                    "Memory usage is very high ({current_mb:.0}MB). Some background tabs were unloaded."
                );
                log::warn!("MemoryEnforcer: {message}");
                self.sink.warn(&message);
                self.outputs.events.publish(EnforcementEvent::UserWarned {
                    message: message.clone(),
                });
                actions.push(EnforcementAction::UserWarned { message });
            }
        }

        log::debug!(
            "MemoryEnforcer: {:.1}MB -> {} (pressure {:.2}), {} action(s)",
            current_mb,
            status,
            evaluation.pressure,
            actions.len()
        );
        actions
    }

    fn record_status(&self, status: MemoryStatus, used_mb: f64) {
        let mut last = self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *last == status {
            return;
        }
        log::info!("MemoryEnforcer: status {} -> {}", *last, status);
        self.outputs
            .events
            .publish(EnforcementEvent::MemoryStatusChanged {
                previous: *last,
                current: status,
                used_mb,
            });
        *last = status;
    }

    fn clear_caches(&self, reason: &str, actions: &mut Vec<EnforcementAction>) {
        self.outputs.channel.clear_caches(reason);
        self.outputs.events.publish(EnforcementEvent::CachesCleared {
            reason: reason.to_owned(),
        });
        actions.push(EnforcementAction::CachesCleared {
            reason: reason.to_owned(),
        });
    }

    fn unload_oldest(&self, batch: usize, actions: &mut Vec<EnforcementAction>) {
        let ids: Vec<TabId> = registry::read(&self.tabs)
            .background_by_last_access()
            .into_iter()
            .take(batch)
            .collect();
        if ids.is_empty() {
            log::debug!("MemoryEnforcer: no background tab to unload");
            return;
        }
        self.outputs.channel.unload_background_tabs(ids.clone());
        self.outputs
            .events
            .publish(EnforcementEvent::TabsUnloadRequested { ids: ids.clone() });
        actions.push(EnforcementAction::TabsUnloaded { ids });
    }
}
