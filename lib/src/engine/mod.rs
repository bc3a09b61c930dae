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

//! The resolution engine itself: lifecycle, configuration switching, and
//! workload statistics.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use tokio::sync::RwLock;

use kindred_core::{NativeApi, NativeCallGateway, Observer, ObserverHub, Result, SdkError};

pub const COMPONENT_ID: u16 = 6004;

const MSG_DESTROY: u16 = 8005;
const MSG_GET_ACTIVE_CONFIG_ID: u16 = 8017;
const MSG_GET_STATS: u16 = 8022;
const MSG_INITIALIZE: u16 = 8025;
const MSG_PRIME_ENGINE: u16 = 8026;
const MSG_REINITIALIZE: u16 = 8030;
const MSG_REGISTER_OBSERVER: u16 = 8702;
const MSG_UNREGISTER_OBSERVER: u16 = 8704;

/// Lifecycle and statistics calls against the resolution engine.
#[derive(Debug)]
pub struct Engine {
    gateway: NativeCallGateway,
    hub: Arc<ObserverHub>,
    observer_origin: RwLock<String>,
}

impl Engine {
    pub fn new(native: Arc<dyn NativeApi>) -> Self {
        Self {
            gateway: NativeCallGateway::new(native, COMPONENT_ID),
            hub: Arc::new(ObserverHub::new()),
            observer_origin: RwLock::new(String::new()),
        }
    }

    /// Initialize the engine. A `config_id` of zero selects the current
    /// default configuration.
    pub async fn initialize(
        &self,
        instance_name: &str,
        settings: &str,
        config_id: i64,
        verbose_logging: i64,
    ) -> Result<()> {
        trace!("Engine::initialize({instance_name}, config {config_id})");
        let instance = instance_name.to_string();
        let config = settings.to_string();
        let result = self
            .gateway
            .invoke_void(4003, move |native| {
                native.engine_init(&instance, &config, config_id, verbose_logging)
            })
            .await;
        let details = HashMap::from([
            ("instanceName".to_string(), instance_name.to_string()),
            ("settings".to_string(), settings.to_string()),
            ("configId".to_string(), config_id.to_string()),
            ("verboseLogging".to_string(), verbose_logging.to_string()),
        ]);
        self.notify(MSG_INITIALIZE, result.as_ref().err(), details)
            .await;
        result
    }

    /// The configuration id the engine is currently running with.
    pub async fn get_active_config_id(&self) -> Result<i64> {
        trace!("Engine::get_active_config_id");
        let result = self
            .gateway
            .invoke(4001, |native| native.engine_get_active_config_id())
            .await;
        self.notify(
            MSG_GET_ACTIVE_CONFIG_ID,
            result.as_ref().err(),
            HashMap::new(),
        )
        .await;
        result
    }

    /// Workload statistics since the last call.
    pub async fn get_stats(&self) -> Result<String> {
        trace!("Engine::get_stats");
        let result = self
            .gateway
            .invoke(4006, |native| native.engine_get_stats())
            .await;
        self.notify(MSG_GET_STATS, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Pre-load engine resources ahead of the first resolution call.
    pub async fn prime_engine(&self) -> Result<()> {
        trace!("Engine::prime_engine");
        let result = self
            .gateway
            .invoke_void(4004, |native| native.engine_prime())
            .await;
        self.notify(MSG_PRIME_ENGINE, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Switch the engine to the configuration registered under `config_id`.
    pub async fn reinitialize(&self, config_id: i64) -> Result<()> {
        trace!("Engine::reinitialize({config_id})");
        let result = self
            .gateway
            .invoke_void(4005, move |native| native.engine_reinit(config_id))
            .await;
        let details = HashMap::from([("configId".to_string(), config_id.to_string())]);
        self.notify(MSG_REINITIALIZE, result.as_ref().err(), details)
            .await;
        result
    }

    /// Tear down the engine.
    pub async fn destroy(&self) -> Result<()> {
        trace!("Engine::destroy");
        let result = self
            .gateway
            .invoke_void(4002, |native| native.engine_destroy())
            .await;
        self.notify(MSG_DESTROY, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    // --- observers ---------------------------------------------------------

    pub async fn register_observer(&self, observer: Arc<dyn Observer>) {
        let observer_id = observer.id().to_string();
        self.hub.register(observer).await;
        let details = HashMap::from([("observerId".to_string(), observer_id)]);
        self.notify(MSG_REGISTER_OBSERVER, None, details).await;
    }

    pub async fn unregister_observer(&self, observer_id: &str) {
        let details = HashMap::from([("observerId".to_string(), observer_id.to_string())]);
        self.notify(MSG_UNREGISTER_OBSERVER, None, details).await;
        self.hub.unregister(observer_id).await;
    }

    pub async fn set_observer_origin(&self, origin: &str) {
        *self.observer_origin.write().await = origin.to_string();
    }

    pub async fn get_observer_origin(&self) -> String {
        self.observer_origin.read().await.clone()
    }

    async fn notify(
        &self,
        message_id: u16,
        error: Option<&SdkError>,
        mut details: HashMap<String, String>,
    ) {
        if !self.hub.has_observers().await {
            return;
        }
        let origin = self.observer_origin.read().await.clone();
        if !origin.is_empty() {
            details.insert("origin".to_string(), origin);
        }
        self.hub
            .notify(COMPONENT_ID, message_id, error, details)
            .await;
    }
}
