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

//! Registries of managed tabs and background tasks.
//!
//! Both registries are ordered maps so that every iteration (and therefore
//! every enforcement pass) is deterministic for a given content.

use lumen_core::{TabId, TabRecord, TabState, TaskId, TaskRecord, TaskState};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A tab registry shared between the tab and memory enforcers.
pub type SharedTabRegistry = Arc<RwLock<TabRegistry>>;

/// Acquires a read guard, recovering the data if a writer panicked.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquires a write guard, recovering the data if a writer panicked.
pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Number of tabs per live state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabCounts {
    /// Tabs with focus.
    pub active: usize,
    /// Live tabs without focus.
    pub background: usize,
    /// Suspended tabs.
    pub suspended: usize,
}

/// Live tabs, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct TabRegistry {
    tabs: BTreeMap<TabId, TabRecord>,
}

impl TabRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a tab. Discarded records are not stored.
    pub fn register(&mut self, record: TabRecord) {
        if record.state == TabState::Discarded {
            log::debug!("TabRegistry: ignoring discarded {}", record.id);
            return;
        }
        log::trace!("TabRegistry: registered {} ({})", record.id, record.state);
        self.tabs.insert(record.id, record);
    }

    /// Removes a tab, returning its record.
    pub fn remove(&mut self, id: TabId) -> Option<TabRecord> {
        self.tabs.remove(&id)
    }

    /// Looks up a tab.
    pub fn get(&self, id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TabId) -> Option<&mut TabRecord> {
        self.tabs.get_mut(&id)
    }

    /// Number of registered tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// `true` if no tab is registered.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Iterates tabs in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TabRecord> {
        self.tabs.values()
    }

    /// Gives focus to a live tab and refreshes its last access time.
    ///
    /// Returns `false` for unknown or suspended tabs; suspended tabs come back
    /// through the tab enforcer's resume.
    pub fn activate(&mut self, id: TabId, now_ms: u64) -> bool {
        match self.tabs.get_mut(&id) {
            Some(tab) if matches!(tab.state, TabState::Active | TabState::Background) => {
                tab.state = TabState::Active;
                tab.last_accessed_ms = tab.last_accessed_ms.max(now_ms);
                true
            }
            _ => false,
        }
    }

    /// Moves an active tab to the background. Unknown ids are ignored.
    pub fn deactivate(&mut self, id: TabId) -> bool {
        match self.tabs.get_mut(&id) {
            Some(tab) if tab.state == TabState::Active => {
                tab.state = TabState::Background;
                true
            }
            _ => false,
        }
    }

    /// Updates a tab's memory estimate. Unknown ids are ignored.
    pub fn update_memory(&mut self, id: TabId, memory_usage_mb: f64) -> bool {
        match self.tabs.get_mut(&id) {
            Some(tab) => {
                tab.memory_usage_mb = memory_usage_mb.max(0.0);
                true
            }
            None => false,
        }
    }

    /// Background tabs, least recently accessed first.
    pub fn background_by_last_access(&self) -> Vec<TabId> {
        let mut candidates: Vec<&TabRecord> = self
            .tabs
            .values()
            .filter(|tab| tab.state.is_suspendable())
            .collect();
        candidates.sort_by_key(|tab| (tab.last_accessed_ms, tab.id));
        candidates.into_iter().map(|tab| tab.id).collect()
    }

    /// Suspended tabs, oldest creation first.
    pub fn suspended_by_creation(&self) -> Vec<TabId> {
        let mut candidates: Vec<&TabRecord> = self
            .tabs
            .values()
            .filter(|tab| tab.state == TabState::Suspended)
            .collect();
        candidates.sort_by_key(|tab| (tab.created_ms, tab.id));
        candidates.into_iter().map(|tab| tab.id).collect()
    }

    /// Tab counts per live state.
    pub fn counts(&self) -> TabCounts {
        self.tabs
            .values()
            .fold(TabCounts::default(), |mut counts, tab| {
                match tab.state {
                    TabState::Active => counts.active += 1,
                    TabState::Background => counts.background += 1,
                    TabState::Suspended => counts.suspended += 1,
                    TabState::Discarded => {}
                }
                counts
            })
    }
}

/// Number of tasks per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    /// Registered, not started.
    pub pending: usize,
    /// Executing.
    pub running: usize,
    /// Held by the enforcer.
    pub paused: usize,
    /// Finished, successfully or not.
    pub finished: usize,
}

/// Background tasks, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskId, TaskRecord>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a task.
    pub fn register(&mut self, record: TaskRecord) {
        log::trace!(
            "TaskRegistry: registered {} ({}, {})",
            record.id,
            record.priority,
            record.state
        );
        self.tasks.insert(record.id, record);
    }

    /// Removes a task, returning its record.
    pub fn remove(&mut self, id: TaskId) -> Option<TaskRecord> {
        self.tasks.remove(&id)
    }

    /// Looks up a task.
    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.get(&id)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` if no task is registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates tasks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TaskRecord> {
        self.tasks.values_mut()
    }

    /// Moves a task to `state`.
    ///
    /// Terminal tasks never leave their state; unknown ids are ignored. Returns
    /// `true` if the state changed.
    pub fn transition(&mut self, id: TaskId, state: TaskState) -> bool {
        match self.tasks.get_mut(&id) {
            Some(task) if !task.state.is_terminal() && task.state != state => {
                log::trace!("TaskRegistry: {} {} -> {}", id, task.state, state);
                task.state = state;
                true
            }
            _ => false,
        }
    }

    /// Task counts per state.
    pub fn counts(&self) -> TaskCounts {
        self.tasks
            .values()
            .fold(TaskCounts::default(), |mut counts, task| {
                match task.state {
                    TaskState::Pending => counts.pending += 1,
                    TaskState::Running => counts.running += 1,
                    TaskState::Paused => counts.paused += 1,
                    TaskState::Completed | TaskState::Failed => counts.finished += 1,
                }
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::TaskPriority;

    fn tab(id: u64, state: TabState, accessed: u64, created: u64) -> TabRecord {
        TabRecord {
            id: TabId(id),
            state,
            memory_usage_mb: 50.0,
            last_accessed_ms: accessed,
            created_ms: created,
        }
    }

    #[test]
    fn test_background_candidates_sorted_by_access() {
        let mut registry = TabRegistry::new();
        registry.register(tab(1, TabState::Background, 300, 1));
        registry.register(tab(2, TabState::Active, 100, 2));
        registry.register(tab(3, TabState::Background, 100, 3));
        registry.register(tab(4, TabState::Suspended, 50, 4));

        assert_eq!(
            registry.background_by_last_access(),
            vec![TabId(3), TabId(1)]
        );
        assert_eq!(registry.suspended_by_creation(), vec![TabId(4)]);
    }

    #[test]
    fn test_focus_changes() {
        let mut registry = TabRegistry::new();
        registry.register(tab(1, TabState::Background, 10, 10));
        registry.register(tab(2, TabState::Suspended, 10, 10));

        assert!(registry.activate(TabId(1), 500));
        assert_eq!(registry.get(TabId(1)).unwrap().state, TabState::Active);
        assert_eq!(registry.get(TabId(1)).unwrap().last_accessed_ms, 500);

        assert!(!registry.activate(TabId(2), 500));
        assert!(!registry.activate(TabId(99), 500));

        assert!(registry.deactivate(TabId(1)));
        assert!(!registry.deactivate(TabId(1)));
        assert_eq!(registry.get(TabId(1)).unwrap().state, TabState::Background);
    }

    #[test]
    fn test_discarded_records_are_not_registered() {
        let mut registry = TabRegistry::new();
        registry.register(tab(1, TabState::Discarded, 0, 0));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tab_counts() {
        let mut registry = TabRegistry::new();
        registry.register(tab(1, TabState::Active, 0, 0));
        registry.register(tab(2, TabState::Background, 0, 0));
        registry.register(tab(3, TabState::Background, 0, 0));
        registry.register(tab(4, TabState::Suspended, 0, 0));
        assert_eq!(
            registry.counts(),
            TabCounts {
                active: 1,
                background: 2,
                suspended: 1
            }
        );
    }

    #[test]
    fn test_terminal_tasks_do_not_transition() {
        let mut registry = TaskRegistry::new();
        let id = TaskId::from_name("upload");
        registry.register(
            TaskRecord::new(id, TaskPriority::Normal).with_state(TaskState::Running),
        );

        assert!(registry.transition(id, TaskState::Completed));
        assert!(!registry.transition(id, TaskState::Running));
        assert_eq!(registry.get(id).unwrap().state, TaskState::Completed);
        assert!(!registry.transition(TaskId::from_name("ghost"), TaskState::Paused));
        assert_eq!(registry.counts().finished, 1);
    }
}
