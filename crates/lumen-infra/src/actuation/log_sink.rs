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

//! Log-only collaborators for headless hosts.

use lumen_core::platform::{ActuationChannel, ActuationRequest, NotificationSink};

/// Writes every corrective request to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogActuator;

impl ActuationChannel for LogActuator {
    fn submit(&self, request: ActuationRequest) {
        log::info!("actuation: {}", request);
    }
}

/// Writes user warnings to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn warn(&self, message: &str) {
        log::warn!("user notification: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_log_collaborators_accept_every_request() {
        let channel: Arc<dyn ActuationChannel> = Arc::new(LogActuator);
        let sink: Arc<dyn NotificationSink> = Arc::new(LogNotificationSink);
        channel.clear_caches("memory warning");
        channel.trigger_gc();
        channel.set_animations(false);
        sink.warn("Memory usage is very high.");
    }
}
