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

//! In-memory configuration editing.
//!
//! A [`Config`] manipulates configuration documents held by the engine
//! behind opaque handles: create one from the built-in template or import
//! an existing definition, add and delete data sources, export the
//! document, and close the handle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::trace;
use tokio::sync::{Mutex, RwLock};

use kindred_core::{
    error_id, ConfigHandle, NativeApi, NativeCallGateway, Observer, ObserverHub, Result, SdkError,
};

pub const COMPONENT_ID: u16 = 6001;

// Message ids of this component's operations.
const MSG_ADD_DATA_SOURCE: u16 = 8001;
const MSG_CLOSE_CONFIG: u16 = 8002;
const MSG_CREATE_CONFIG: u16 = 8003;
const MSG_DELETE_DATA_SOURCE: u16 = 8004;
const MSG_DESTROY: u16 = 8005;
const MSG_EXPORT_CONFIG: u16 = 8006;
const MSG_INITIALIZE: u16 = 8007;
const MSG_GET_DATA_SOURCES: u16 = 8008;
const MSG_IMPORT_CONFIG: u16 = 8009;
const MSG_REGISTER_OBSERVER: u16 = 8702;
const MSG_UNREGISTER_OBSERVER: u16 = 8704;

/// Editor over engine-held configuration documents.
#[derive(Debug)]
pub struct Config {
    gateway: NativeCallGateway,
    hub: Arc<ObserverHub>,
    observer_origin: RwLock<String>,
    // Handles this instance opened and has not yet closed. Operations on a
    // handle outside this set fail before reaching the engine.
    live_handles: Mutex<HashSet<ConfigHandle>>,
}

impl Config {
    pub fn new(native: Arc<dyn NativeApi>) -> Self {
        Self {
            gateway: NativeCallGateway::new(native, COMPONENT_ID),
            hub: Arc::new(ObserverHub::new()),
            observer_origin: RwLock::new(String::new()),
            live_handles: Mutex::new(HashSet::new()),
        }
    }

    /// Initialize the engine's configuration subsystem.
    pub async fn initialize(
        &self,
        instance_name: &str,
        settings: &str,
        verbose_logging: i64,
    ) -> Result<()> {
        trace!("Config::initialize({instance_name})");
        let instance = instance_name.to_string();
        let config = settings.to_string();
        let result = self
            .gateway
            .invoke_void(4007, move |native| {
                native.config_init(&instance, &config, verbose_logging)
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

    /// Create a handle over the built-in template configuration.
    pub async fn create_config(&self) -> Result<ConfigHandle> {
        trace!("Config::create_config");
        let result = self
            .gateway
            .invoke(4003, |native| native.config_create())
            .await;
        if let Ok(handle) = &result {
            self.live_handles.lock().await.insert(*handle);
        }
        self.notify(MSG_CREATE_CONFIG, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Load an existing configuration definition into a fresh handle.
    pub async fn import_config(&self, definition: &str) -> Result<ConfigHandle> {
        trace!("Config::import_config");
        let definition_owned = definition.to_string();
        let result = self
            .gateway
            .invoke(4009, move |native| native.config_load(&definition_owned))
            .await;
        if let Ok(handle) = &result {
            self.live_handles.lock().await.insert(*handle);
        }
        self.notify(MSG_IMPORT_CONFIG, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Register a data source code on the document behind `handle`.
    ///
    /// Returns the engine's `{"DSRC_ID": <id>}` fragment. Registering a
    /// code that already exists answers with its current id.
    pub async fn add_data_source(
        &self,
        handle: ConfigHandle,
        data_source_code: &str,
    ) -> Result<String> {
        trace!("Config::add_data_source({data_source_code})");
        let fragment = data_source_fragment(data_source_code);
        let result = match self.ensure_open(handle, 4001).await {
            Ok(()) => {
                self.gateway
                    .invoke(4001, move |native| {
                        native.config_add_data_source(handle, &fragment)
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        let mut details = HashMap::from([(
            "dataSourceCode".to_string(),
            data_source_code.to_string(),
        )]);
        if let Ok(response) = &result {
            details.insert("return".to_string(), response.clone());
        }
        self.notify(MSG_ADD_DATA_SOURCE, result.as_ref().err(), details)
            .await;
        result
    }

    /// Remove a data source code. Removing an absent code succeeds.
    pub async fn delete_data_source(
        &self,
        handle: ConfigHandle,
        data_source_code: &str,
    ) -> Result<()> {
        trace!("Config::delete_data_source({data_source_code})");
        let fragment = data_source_fragment(data_source_code);
        let result = match self.ensure_open(handle, 4004).await {
            Ok(()) => {
                self.gateway
                    .invoke_void(4004, move |native| {
                        native.config_delete_data_source(handle, &fragment)
                    })
                    .await
            }
            Err(e) => Err(e),
        };
        let details = HashMap::from([(
            "dataSourceCode".to_string(),
            data_source_code.to_string(),
        )]);
        self.notify(MSG_DELETE_DATA_SOURCE, result.as_ref().err(), details)
            .await;
        result
    }

    /// List the data sources of the document behind `handle`.
    pub async fn get_data_sources(&self, handle: ConfigHandle) -> Result<String> {
        trace!("Config::get_data_sources");
        let result = match self.ensure_open(handle, 4008).await {
            Ok(()) => {
                self.gateway
                    .invoke(4008, move |native| native.config_list_data_sources(handle))
                    .await
            }
            Err(e) => Err(e),
        };
        self.notify(MSG_GET_DATA_SOURCES, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Export the document behind `handle` as its JSON definition.
    pub async fn export_config(&self, handle: ConfigHandle) -> Result<String> {
        trace!("Config::export_config");
        let result = match self.ensure_open(handle, 4010).await {
            Ok(()) => {
                self.gateway
                    .invoke(4010, move |native| native.config_save(handle))
                    .await
            }
            Err(e) => Err(e),
        };
        self.notify(MSG_EXPORT_CONFIG, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Close `handle`, releasing its document. Closing an already-closed
    /// handle is an error.
    pub async fn close_config(&self, handle: ConfigHandle) -> Result<()> {
        trace!("Config::close_config");
        let result = match self.ensure_open(handle, 4002).await {
            Ok(()) => {
                let closed = self
                    .gateway
                    .invoke_void(4002, move |native| native.config_close(handle))
                    .await;
                if closed.is_ok() {
                    self.live_handles.lock().await.remove(&handle);
                }
                closed
            }
            Err(e) => Err(e),
        };
        self.notify(MSG_CLOSE_CONFIG, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// Tear down the engine's configuration subsystem.
    pub async fn destroy(&self) -> Result<()> {
        trace!("Config::destroy");
        let result = self
            .gateway
            .invoke_void(4005, |native| native.config_destroy())
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
        // Notify before removal so the departing observer sees its own exit.
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

    // --- internal ----------------------------------------------------------

    /// Fail fast on a handle this instance never opened or already closed.
    async fn ensure_open(&self, handle: ConfigHandle, call_site: u16) -> Result<()> {
        if self.live_handles.lock().await.contains(&handle) {
            Ok(())
        } else {
            Err(SdkError::bad_input(
                error_id(COMPONENT_ID, call_site),
                format!("configuration handle {handle} is not open"),
            ))
        }
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

fn data_source_fragment(data_source_code: &str) -> String {
    format!(r#"{{"DSRC_CODE": "{data_source_code}"}}"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_fragment_shape() {
        assert_eq!(
            data_source_fragment("CUSTOMERS"),
            r#"{"DSRC_CODE": "CUSTOMERS"}"#
        );
    }
}
