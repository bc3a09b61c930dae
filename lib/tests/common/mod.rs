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

//! Shared test fixtures.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use kindred_sdk::Observer;

/// Observer that forwards every payload into an unbounded channel so tests
/// can assert on delivery.
pub struct ChannelObserver {
    id: String,
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelObserver {
    pub fn new(id: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                id: id.to_string(),
                sender,
            }),
            receiver,
        )
    }
}

#[async_trait]
impl Observer for ChannelObserver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn observe(&self, event: String) {
        let _ = self.sender.send(event);
    }
}

/// Receive the next event or panic after one second.
pub async fn next_event(receiver: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(Duration::from_secs(1), receiver.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("notification channel closed")
}

/// Receive events until one carries `message_id`, returning it parsed.
///
/// Dispatch is fan-out on detached tasks, so arrival order between two
/// operations is not guaranteed; matching on the message id keeps the
/// assertions order-independent.
pub async fn event_with_message_id(
    receiver: &mut mpsc::UnboundedReceiver<String>,
    message_id: u16,
) -> serde_json::Value {
    for _ in 0..16 {
        let event = next_event(receiver).await;
        let parsed: serde_json::Value =
            serde_json::from_str(&event).expect("notification is not valid JSON");
        if parsed["messageId"] == message_id {
            return parsed;
        }
    }
    panic!("no notification with message id {message_id} arrived");
}

/// Assert that no event arrives within a short grace period.
pub async fn assert_no_event(receiver: &mut mpsc::UnboundedReceiver<String>) {
    let outcome = timeout(Duration::from_millis(100), receiver.recv()).await;
    assert!(outcome.is_err(), "unexpected notification: {outcome:?}");
}
