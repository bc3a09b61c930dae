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

//! Datastore inspection and maintenance.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use tokio::sync::RwLock;

use kindred_core::{NativeApi, NativeCallGateway, Observer, ObserverHub, Result, SdkError};

pub const COMPONENT_ID: u16 = 6003;

const MSG_CHECK_DATASTORE_PERFORMANCE: u16 = 8001;
const MSG_DESTROY: u16 = 8002;
const MSG_GET_DATASTORE_INFO: u16 = 8003;
const MSG_INITIALIZE: u16 = 8005;
const MSG_PURGE_REPOSITORY: u16 = 8007;
const MSG_REINITIALIZE: u16 = 8008;
const MSG_REGISTER_OBSERVER: u16 = 8702;
const MSG_UNREGISTER_OBSERVER: u16 = 8704;

/// Inspection and maintenance calls against the engine's datastore.
#[derive(Debug)]
pub struct Diagnostic {
    gateway: NativeCallGateway,
    hub: Arc<ObserverHub>,
    observer_origin: RwLock<String>,
}

impl Diagnostic {
    pub fn new(native: Arc<dyn NativeApi>) -> Self {
        Self {
            gateway: NativeCallGateway::new(native, COMPONENT_ID),
            hub: Arc::new(ObserverHub::new()),
            observer_origin: RwLock::new(String::new()),
        }
    }

    /// Initialize the engine's diagnostic subsystem. A `config_id` of zero
    /// selects the current default configuration.
    pub async fn initialize(
        &self,
        instance_name: &str,
        settings: &str,
        config_id: i64,
        verbose_logging: i64,
    ) -> Result<()> {
        trace!("Diagnostic::initialize({instance_name}, config {config_id})");
        let instance = instance_name.to_string();
        let config = settings.to_string();
        let result = self
            .gateway
            .invoke_void(4005, move |native| {
                native.diagnostic_init(&instance, &config, config_id, verbose_logging)
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

    /// Describe the datastores behind the engine.
    pub async fn get_datastore_info(&self) -> Result<String> {
        trace!("Diagnostic::get_datastore_info");
        let result = self
            .gateway
            .invoke(4003, |native| native.diagnostic_get_datastore_info())
            .await;
        self.notify(MSG_GET_DATASTORE_INFO, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Run an insert benchmark against the datastore for roughly
    /// `seconds_to_run` seconds.
    pub async fn check_datastore_performance(&self, seconds_to_run: i64) -> Result<String> {
        trace!("Diagnostic::check_datastore_performance({seconds_to_run}s)");
        let result = self
            .gateway
            .invoke(4001, move |native| {
                native.diagnostic_check_datastore_performance(seconds_to_run)
            })
            .await;
        let details = HashMap::from([("secondsToRun".to_string(), seconds_to_run.to_string())]);
        self.notify(
            MSG_CHECK_DATASTORE_PERFORMANCE,
            result.as_ref().err(),
            details,
        )
        .await;
        result
    }

    /// Irreversibly delete every record in the repository.
    pub async fn purge_repository(&self) -> Result<()> {
        trace!("Diagnostic::purge_repository");
        let result = self
            .gateway
            .invoke_void(4006, |native| native.diagnostic_purge_repository())
            .await;
        self.notify(MSG_PURGE_REPOSITORY, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Switch this subsystem to the configuration registered under
    /// `config_id`.
    pub async fn reinitialize(&self, config_id: i64) -> Result<()> {
        trace!("Diagnostic::reinitialize({config_id})");
        let result = self
            .gateway
            .invoke_void(4007, move |native| native.diagnostic_reinit(config_id))
            .await;
        let details = HashMap::from([("configId".to_string(), config_id.to_string())]);
        self.notify(MSG_REINITIALIZE, result.as_ref().err(), details)
            .await;
        result
    }

    /// Tear down the engine's diagnostic subsystem.
    pub async fn destroy(&self) -> Result<()> {
        trace!("Diagnostic::destroy");
        let result = self
            .gateway
            .invoke_void(4002, |native| native.diagnostic_destroy())
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
