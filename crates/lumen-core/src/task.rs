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

//! Deferred background task records managed by the background-task enforcer.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a stable identifier from a task name.
    ///
    /// The same name always yields the same id, which lets hosts re-register
    /// a recurring job without tracking its id.
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0.simple())
    }
}

/// Scheduling priority, ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    /// Opportunistic work (prefetch, indexing).
    Low,
    /// Regular deferred work.
    #[default]
    Normal,
    /// User-visible soon.
    High,
    /// Must never be paused.
    Critical,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Normal => "NORMAL",
            TaskPriority::High => "HIGH",
            TaskPriority::Critical => "CRITICAL",
        })
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Registered but not started by the caller.
    #[default]
    Pending,
    /// Executing.
    Running,
    /// Held by the enforcer until pressure clears.
    Paused,
    /// Finished successfully. Terminal.
    Completed,
    /// Finished with an error. Terminal.
    Failed,
}

impl TaskState {
    /// `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Paused => "paused",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        })
    }
}

/// A deferred unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier.
    pub id: TaskId,
    /// Scheduling priority.
    pub priority: TaskPriority,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Declared CPU cost (0 to 100).
    pub cpu_intensity: u8,
    /// Declared battery cost (0 to 100).
    pub battery_intensity: u8,
    /// Caller's estimate of the remaining run time, in milliseconds.
    pub estimated_duration_ms: u64,
}

impl TaskRecord {
    /// Creates a pending task with the given priority and zero declared cost.
    pub fn new(id: TaskId, priority: TaskPriority) -> Self {
        Self {
            id,
            priority,
            state: TaskState::Pending,
            cpu_intensity: 0,
            battery_intensity: 0,
            estimated_duration_ms: 0,
        }
    }

    /// Sets the declared CPU and battery intensities (each clamped to 100).
    pub fn with_intensity(mut self, cpu: u8, battery: u8) -> Self {
        self.cpu_intensity = cpu.min(100);
        self.battery_intensity = battery.min(100);
        self
    }

    /// Sets the initial state.
    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(TaskPriority::Low < TaskPriority::Normal);
        assert!(TaskPriority::Normal < TaskPriority::High);
        assert!(TaskPriority::High < TaskPriority::Critical);
    }

    #[test]
    fn test_named_ids_are_stable() {
        assert_eq!(TaskId::from_name("sync"), TaskId::from_name("sync"));
        assert_ne!(TaskId::from_name("sync"), TaskId::from_name("index"));
    }

    #[test]
    fn test_intensity_is_clamped() {
        let task = TaskRecord::new(TaskId::new(), TaskPriority::Low).with_intensity(250, 40);
        assert_eq!(task.cpu_intensity, 100);
        assert_eq!(task.battery_intensity, 40);
        assert_eq!(task.state, TaskState::Pending);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Paused.is_terminal());
    }
}
