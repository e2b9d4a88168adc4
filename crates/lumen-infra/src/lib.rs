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

//! # Lumen Infra
//!
//! Concrete implementations of the collaborator contracts declared in
//! `lumen-core`: a `sysinfo`-backed metrics source with an optional TCP
//! latency probe, and actuation channels that forward corrective requests to
//! the UI process or to the log.

#![warn(missing_docs)]

pub mod actuation;
#[cfg(feature = "platform")]
pub mod platform;

pub use actuation::{ChannelActuator, LogActuator, LogNotificationSink};
#[cfg(feature = "platform")]
pub use platform::{SysinfoMetricsSource, TcpConnectProbe};
