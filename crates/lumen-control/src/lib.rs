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

//! # Lumen Control
//!
//! The adaptive resource policy engine: threshold math, the four domain
//! policies, the four enforcers that turn policy into corrective requests,
//! and the manager that arbitrates between them.
//!
//! Layering, leaves first:
//! [`thresholds`] → [`policy`] → [`enforcer`] → [`manager`] → [`service`].

#![warn(missing_docs)]

pub mod actions;
pub mod config;
pub mod enforcer;
pub mod history;
pub mod manager;
pub mod policy;
pub mod registry;
pub mod service;
pub mod thresholds;

pub use actions::{EnforcementAction, EnforcerActions};
pub use config::{EngineConfig, MemoryThresholdOverrides, ServiceConfig};
pub use manager::{Assessment, DomainAttention, EngineSummary, EnforcerManager};
pub use service::{CycleReport, PolicyService, ServiceError};
