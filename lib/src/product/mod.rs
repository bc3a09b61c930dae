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

//! License and version metadata of the installed engine.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use tokio::sync::RwLock;

use kindred_core::{NativeApi, NativeCallGateway, Observer, ObserverHub, Result, SdkError};

pub const COMPONENT_ID: u16 = 6005;

const MSG_DESTROY: u16 = 8001;
const MSG_GET_LICENSE: u16 = 8002;
const MSG_GET_VERSION: u16 = 8003;
const MSG_INITIALIZE: u16 = 8004;
const MSG_REGISTER_OBSERVER: u16 = 8702;
const MSG_UNREGISTER_OBSERVER: u16 = 8704;

/// Read-only product metadata calls.
#[derive(Debug)]
pub struct Product {
    gateway: NativeCallGateway,
    hub: Arc<ObserverHub>,
    observer_origin: RwLock<String>,
}

impl Product {
    pub fn new(native: Arc<dyn NativeApi>) -> Self {
        Self {
            gateway: NativeCallGateway::new(native, COMPONENT_ID),
            hub: Arc::new(ObserverHub::new()),
            observer_origin: RwLock::new(String::new()),
        }
    }

    /// Initialize the engine's product subsystem.
    pub async fn initialize(
        &self,
        instance_name: &str,
        settings: &str,
        verbose_logging: i64,
    ) -> Result<()> {
        trace!("Product::initialize({instance_name})");
        let instance = instance_name.to_string();
        let config = settings.to_string();
        let result = self
            .gateway
            .invoke_void(4002, move |native| {
                native.product_init(&instance, &config, verbose_logging)
            })
            .await;
        let details = HashMap::from([
            ("instanceName".to_string(), instance_name.to_string()),
            ("settings".to_string(), settings.to_string()),
            ("verboseLogging".to_string(), verbose_logging.to_string()),
        ]);
        self.notify(MSG_INITIALIZE, result.as_ref().err(), details)
            .await;
        result
    }

    /// The license document of the installed engine.
    pub async fn get_license(&self) -> Result<String> {
        trace!("Product::get_license");
        let result = self
            .gateway
            .invoke(4003, |native| native.product_get_license())
            .await;
        self.notify(MSG_GET_LICENSE, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// The version document of the installed engine.
    pub async fn get_version(&self) -> Result<String> {
        trace!("Product::get_version");
        let result = self
            .gateway
            .invoke(4004, |native| native.product_get_version())
            .await;
        self.notify(MSG_GET_VERSION, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Tear down the engine's product subsystem.
    pub async fn destroy(&self) -> Result<()> {
        trace!("Product::destroy");
        let result = self
            .gateway
            .invoke_void(4001, |native| native.product_destroy())
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
