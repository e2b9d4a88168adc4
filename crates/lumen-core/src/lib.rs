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

//! # Lumen Core
//!
//! Foundational crate containing the data model, the collaborator contracts
//! (metrics sources, actuation channels, notification sinks) and the typed
//! event channel shared by the policy engine and its hosts.

#![warn(missing_docs)]

pub mod clock;
pub mod event;
pub mod metrics;
pub mod platform;
pub mod status;
pub mod tab;
pub mod task;

pub use metrics::{SystemCapacity, SystemMetricsSnapshot};
pub use status::{BatteryStatus, CpuStatus, MemoryStatus, NetworkProfile};
pub use tab::{TabId, TabRecord, TabState};
pub use task::{TaskId, TaskPriority, TaskRecord, TaskState};
