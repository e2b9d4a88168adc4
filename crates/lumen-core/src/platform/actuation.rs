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

//! Outbound corrective requests.

use crate::tab::TabId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A corrective request addressed to the UI process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuationRequest {
    /// Drop in-memory caches.
    ClearCaches {
        /// Why the caches are being cleared.
        reason: String,
    },
    /// Release the renderer content of the given background tabs.
    UnloadBackgroundTabs {
        /// Tabs to unload, oldest first.
        ids: Vec<TabId>,
    },
    /// Suspend a tab, keeping its identity.
    SuspendTab {
        /// Tab to suspend.
        id: TabId,
    },
    /// Bring a suspended tab back.
    ResumeTab {
        /// Tab to resume.
        id: TabId,
    },
    /// Drop a tab permanently.
    DiscardTab {
        /// Tab to discard.
        id: TabId,
    },
    /// Set the image quality used for newly decoded images.
    SetImageQuality {
        /// Quality, 0 to 100.
        percent: u8,
    },
    /// Enable or disable video autoplay.
    SetVideoAutoplay {
        /// New autoplay flag.
        enabled: bool,
    },
    /// Enable or disable UI animations.
    SetAnimations {
        /// New animations flag.
        enabled: bool,
    },
    /// Set the timeout applied to cross-process calls.
    SetIpcTimeout {
        /// New timeout.
        timeout: Duration,
    },
    /// Pause a background task.
    PauseTask {
        /// Task to pause.
        id: TaskId,
    },
    /// Resume a paused background task.
    ResumeTask {
        /// Task to resume.
        id: TaskId,
    },
    /// Request a garbage-collection pass.
    TriggerGc,
}

impl fmt::Display for ActuationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuationRequest::ClearCaches { reason } => write!(f, "clear caches ({reason})"),
            ActuationRequest::UnloadBackgroundTabs { ids } => {
                write!(f, "unload {} background tab(s)", ids.len())
            }
            ActuationRequest::SuspendTab { id } => write!(f, "suspend {id}"),
            ActuationRequest::ResumeTab { id } => write!(f, "resume {id}"),
            ActuationRequest::DiscardTab { id } => write!(f, "discard {id}"),
            ActuationRequest::SetImageQuality { percent } => {
                write!(f, "set image quality {percent}%")
            }
            ActuationRequest::SetVideoAutoplay { enabled } => {
                write!(f, "set video autoplay {enabled}")
            }
            ActuationRequest::SetAnimations { enabled } => write!(f, "set animations {enabled}"),
            ActuationRequest::SetIpcTimeout { timeout } => {
                write!(f, "set ipc timeout {}ms", timeout.as_millis())
            }
            ActuationRequest::PauseTask { id } => write!(f, "pause {id}"),
            ActuationRequest::ResumeTask { id } => write!(f, "resume {id}"),
            ActuationRequest::TriggerGc => f.write_str("trigger gc"),
        }
    }
}

/// Fire-and-forget channel carrying corrective requests to the UI process.
///
/// Implementations must not block: a request that cannot be delivered is
/// dropped. Enforcers never retry and never observe delivery failures.
pub trait ActuationChannel: Send + Sync {
    /// Delivers a request, best effort.
    fn submit(&self, request: ActuationRequest);

    /// Requests a cache clear.
    fn clear_caches(&self, reason: &str) {
        self.submit(ActuationRequest::ClearCaches {
            reason: reason.to_owned(),
        });
    }

    /// Requests an unload of the given background tabs.
    fn unload_background_tabs(&self, ids: Vec<TabId>) {
        if !ids.is_empty() {
            self.submit(ActuationRequest::UnloadBackgroundTabs { ids });
        }
    }

    /// Requests a tab suspension.
    fn suspend_tab(&self, id: TabId) {
        self.submit(ActuationRequest::SuspendTab { id });
    }

    /// Requests a tab resume.
    fn resume_tab(&self, id: TabId) {
        self.submit(ActuationRequest::ResumeTab { id });
    }

    /// Requests a tab discard.
    fn discard_tab(&self, id: TabId) {
        self.submit(ActuationRequest::DiscardTab { id });
    }

    /// Pushes a new image quality.
    fn set_image_quality(&self, percent: u8) {
        self.submit(ActuationRequest::SetImageQuality {
            percent: percent.min(100),
        });
    }

    /// Pushes the video autoplay flag.
    fn set_video_autoplay(&self, enabled: bool) {
        self.submit(ActuationRequest::SetVideoAutoplay { enabled });
    }

    /// Pushes the animations flag.
    fn set_animations(&self, enabled: bool) {
        self.submit(ActuationRequest::SetAnimations { enabled });
    }

    /// Pushes the cross-process call timeout.
    fn set_ipc_timeout(&self, timeout: Duration) {
        self.submit(ActuationRequest::SetIpcTimeout { timeout });
    }

    /// Requests a task pause.
    fn pause_task(&self, id: TaskId) {
        self.submit(ActuationRequest::PauseTask { id });
    }

    /// Requests a task resume.
    fn resume_task(&self, id: TaskId) {
        self.submit(ActuationRequest::ResumeTask { id });
    }

    /// Requests a garbage-collection pass.
    fn trigger_gc(&self) {
        self.submit(ActuationRequest::TriggerGc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ActuationRequest>>);

    impl ActuationChannel for Recorder {
        fn submit(&self, request: ActuationRequest) {
            self.0.lock().unwrap().push(request);
        }
    }

    #[test]
    fn test_convenience_methods_route_through_submit() {
        let recorder = Recorder::default();
        recorder.clear_caches("memory warning");
        recorder.set_image_quality(140);
        recorder.trigger_gc();

        let requests = recorder.0.lock().unwrap();
        assert_eq!(
            *requests,
            vec![
                ActuationRequest::ClearCaches {
                    reason: "memory warning".into()
                },
                ActuationRequest::SetImageQuality { percent: 100 },
                ActuationRequest::TriggerGc,
            ]
        );
    }

    #[test]
    fn test_empty_unload_is_not_sent() {
        let recorder = Recorder::default();
        recorder.unload_background_tabs(Vec::new());
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_display() {
        let request = ActuationRequest::SetIpcTimeout {
            timeout: Duration::from_secs(15),
        };
        assert_eq!(request.to_string(), "set ipc timeout 15000ms");
    }
}
