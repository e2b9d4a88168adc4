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

//! Contracts with the host process: sensors in, corrective requests and
//! user notifications out.
//!
//! Concrete implementations live in `lumen-infra` or in the host itself. The
//! policy engine only ever talks to these traits.

pub mod actuation;

pub use actuation::{ActuationChannel, ActuationRequest};

use crate::metrics::SystemMetricsSnapshot;
use thiserror::Error;

/// Errors raised while sampling system metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A sensor could not be read.
    #[error("sensor '{sensor}' unavailable: {reason}")]
    SensorUnavailable {
        /// Name of the failing sensor.
        sensor: &'static str,
        /// Human-readable cause.
        reason: String,
    },
    /// The sensor backend's internal state is unusable.
    #[error("metrics backend poisoned")]
    Poisoned,
}

/// Supplies metric snapshots on demand.
pub trait MetricsSource: Send + Sync {
    /// Takes a fresh snapshot of system pressure.
    fn sample(&self) -> Result<SystemMetricsSnapshot, MetricsError>;
}

/// Receives human-readable warnings for emergency-tier events.
pub trait NotificationSink: Send + Sync {
    /// Surfaces a warning to the user.
    fn warn(&self, message: &str);
}

/// A sink that discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn warn(&self, _message: &str) {}
}
