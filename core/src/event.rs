// Copyright 2025 The Kindred Authors.
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

//! Notification event schema for observer auditing.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// The JSON event delivered to observers:
/// `{"subjectId": <int>, "messageId": <int>, "messageTime": <ns>,
///   "error": <string, optional>, ...caller-supplied string fields}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Component id of the subject that performed the operation.
    pub subject_id: u16,
    /// Operation message id (e.g. 8001 for add-data-source).
    pub message_id: u16,
    /// Nanoseconds since the Unix epoch at event construction.
    pub message_time: i64,
    /// Rendered error, present only when the operation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Caller-supplied string fields, flattened into the event object.
    #[serde(flatten)]
    pub details: HashMap<String, String>,
}

impl NotificationEvent {
    pub fn new(
        subject_id: u16,
        message_id: u16,
        error: Option<&SdkError>,
        details: HashMap<String, String>,
    ) -> Self {
        Self {
            subject_id,
            message_id,
            message_time: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            error: error.map(|e| e.to_string()),
            details,
        }
    }
}
