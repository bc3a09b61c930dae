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

//! The durable configuration registry.
//!
//! A [`ConfigManager`] registers immutable configuration definitions under
//! engine-assigned ids, reads them back, and moves the repository-wide
//! default id, either unconditionally or with compare-and-swap semantics.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use tokio::sync::RwLock;

use kindred_core::{
    ConfigHandle, NativeApi, NativeCallGateway, Observer, ObserverHub, Result, SdkError,
};

use crate::config::Config;

pub const COMPONENT_ID: u16 = 6002;

const MSG_REGISTER_CONFIG: u16 = 8001;
const MSG_DESTROY: u16 = 8002;
const MSG_GET_CONFIG: u16 = 8003;
const MSG_GET_CONFIG_REGISTRY: u16 = 8004;
const MSG_GET_DEFAULT_CONFIG_ID: u16 = 8005;
const MSG_INITIALIZE: u16 = 8006;
const MSG_REPLACE_DEFAULT_CONFIG_ID: u16 = 8007;
const MSG_SET_DEFAULT_CONFIG_ID: u16 = 8008;
const MSG_SET_DEFAULT_CONFIG: u16 = 8009;
const MSG_CREATE_CONFIG_FROM_ID: u16 = 8010;
const MSG_CREATE_CONFIG_FROM_TEMPLATE: u16 = 8011;
const MSG_REGISTER_OBSERVER: u16 = 8702;
const MSG_UNREGISTER_OBSERVER: u16 = 8704;

#[derive(Debug, Clone)]
struct InitParams {
    instance_name: String,
    settings: String,
    verbose_logging: i64,
}

/// Registry of immutable configuration definitions and the default id.
#[derive(Debug)]
pub struct ConfigManager {
    gateway: NativeCallGateway,
    hub: Arc<ObserverHub>,
    observer_origin: RwLock<String>,
    // Remembered so minted Config editors initialize the same way.
    init_params: RwLock<Option<InitParams>>,
}

impl ConfigManager {
    pub fn new(native: Arc<dyn NativeApi>) -> Self {
        Self {
            gateway: NativeCallGateway::new(native, COMPONENT_ID),
            hub: Arc::new(ObserverHub::new()),
            observer_origin: RwLock::new(String::new()),
            init_params: RwLock::new(None),
        }
    }

    /// Initialize the engine's configuration-registry subsystem.
    pub async fn initialize(
        &self,
        instance_name: &str,
        settings: &str,
        verbose_logging: i64,
    ) -> Result<()> {
        trace!("ConfigManager::initialize({instance_name})");
        let instance = instance_name.to_string();
        let config = settings.to_string();
        let result = self
            .gateway
            .invoke_void(4006, move |native| {
                native.config_mgr_init(&instance, &config, verbose_logging)
            })
            .await;
        if result.is_ok() {
            *self.init_params.write().await = Some(InitParams {
                instance_name: instance_name.to_string(),
                settings: settings.to_string(),
                verbose_logging,
            });
        }
        let details = HashMap::from([
            ("instanceName".to_string(), instance_name.to_string()),
            ("settings".to_string(), settings.to_string()),
            ("verboseLogging".to_string(), verbose_logging.to_string()),
        ]);
        self.notify(MSG_INITIALIZE, result.as_ref().err(), details)
            .await;
        result
    }

    /// Register a definition in the registry. The id is engine-assigned
    /// and never reused; the stored definition is immutable.
    pub async fn register_config(&self, definition: &str, comment: &str) -> Result<i64> {
        trace!("ConfigManager::register_config");
        let definition_owned = definition.to_string();
        let comment_owned = comment.to_string();
        let result = self
            .gateway
            .invoke(4001, move |native| {
                native.config_mgr_add_config(&definition_owned, &comment_owned)
            })
            .await;
        let mut details = HashMap::from([("comment".to_string(), comment.to_string())]);
        if let Ok(config_id) = &result {
            details.insert("configId".to_string(), config_id.to_string());
        }
        self.notify(MSG_REGISTER_CONFIG, result.as_ref().err(), details)
            .await;
        result
    }

    /// Fetch the definition registered under `config_id`.
    pub async fn get_config(&self, config_id: i64) -> Result<String> {
        trace!("ConfigManager::get_config({config_id})");
        let result = self
            .gateway
            .invoke(4003, move |native| native.config_mgr_get_config(config_id))
            .await;
        let details = HashMap::from([("configId".to_string(), config_id.to_string())]);
        self.notify(MSG_GET_CONFIG, result.as_ref().err(), details)
            .await;
        result
    }

    /// List every registered configuration with its comment and creation
    /// timestamp.
    pub async fn get_config_registry(&self) -> Result<String> {
        trace!("ConfigManager::get_config_registry");
        let result = self
            .gateway
            .invoke(4004, |native| native.config_mgr_get_config_list())
            .await;
        self.notify(MSG_GET_CONFIG_REGISTRY, result.as_ref().err(), HashMap::new())
            .await;
        result
    }

    /// The current default configuration id, or zero when none is set.
    pub async fn get_default_config_id(&self) -> Result<i64> {
        trace!("ConfigManager::get_default_config_id");
        let result = self
            .gateway
            .invoke(4005, |native| native.config_mgr_get_default_config_id())
            .await;
        self.notify(
            MSG_GET_DEFAULT_CONFIG_ID,
            result.as_ref().err(),
            HashMap::new(),
        )
        .await;
        result
    }

    /// Set the default configuration id unconditionally.
    pub async fn set_default_config_id(&self, config_id: i64) -> Result<()> {
        trace!("ConfigManager::set_default_config_id({config_id})");
        let result = self
            .gateway
            .invoke_void(4008, move |native| {
                native.config_mgr_set_default_config_id(config_id)
            })
            .await;
        let details = HashMap::from([("configId".to_string(), config_id.to_string())]);
        self.notify(MSG_SET_DEFAULT_CONFIG_ID, result.as_ref().err(), details)
            .await;
        result
    }

    /// Compare-and-swap the default configuration id: succeeds only when
    /// the default still equals `current_default_config_id`.
    pub async fn replace_default_config_id(
        &self,
        current_default_config_id: i64,
        new_default_config_id: i64,
    ) -> Result<()> {
        trace!(
            "ConfigManager::replace_default_config_id({current_default_config_id} -> {new_default_config_id})"
        );
        let result = self
            .gateway
            .invoke_void(4007, move |native| {
                native.config_mgr_replace_default_config_id(
                    current_default_config_id,
                    new_default_config_id,
                )
            })
            .await;
        let details = HashMap::from([
            (
                "currentDefaultConfigId".to_string(),
                current_default_config_id.to_string(),
            ),
            (
                "newDefaultConfigId".to_string(),
                new_default_config_id.to_string(),
            ),
        ]);
        self.notify(
            MSG_REPLACE_DEFAULT_CONFIG_ID,
            result.as_ref().err(),
            details,
        )
        .await;
        result
    }

    /// Register a definition and make it the default in one call.
    pub async fn set_default_config(&self, definition: &str, comment: &str) -> Result<i64> {
        trace!("ConfigManager::set_default_config");
        let result: Result<i64> = async {
            let config_id = self.register_config(definition, comment).await?;
            self.set_default_config_id(config_id).await?;
            Ok(config_id)
        }
        .await;
        let mut details = HashMap::from([("comment".to_string(), comment.to_string())]);
        if let Ok(config_id) = &result {
            details.insert("configId".to_string(), config_id.to_string());
        }
        self.notify(MSG_SET_DEFAULT_CONFIG, result.as_ref().err(), details)
            .await;
        result
    }

    /// Open a [`Config`] editor over the definition registered under
    /// `config_id`.
    pub async fn create_config_from_id(&self, config_id: i64) -> Result<(Config, ConfigHandle)> {
        trace!("ConfigManager::create_config_from_id({config_id})");
        let result = async {
            let definition = self.get_config(config_id).await?;
            let config = self.mint_config().await?;
            let handle = config.import_config(&definition).await?;
            Ok((config, handle))
        }
        .await;
        let details = HashMap::from([("configId".to_string(), config_id.to_string())]);
        self.notify(MSG_CREATE_CONFIG_FROM_ID, result.as_ref().err(), details)
            .await;
        result
    }

    /// Open a [`Config`] editor over the built-in template configuration.
    pub async fn create_config_from_template(&self) -> Result<(Config, ConfigHandle)> {
        trace!("ConfigManager::create_config_from_template");
        let result = async {
            let config = self.mint_config().await?;
            let handle = config.create_config().await?;
            Ok((config, handle))
        }
        .await;
        self.notify(
            MSG_CREATE_CONFIG_FROM_TEMPLATE,
            result.as_ref().err(),
            HashMap::new(),
        )
        .await;
        result
    }

    /// Tear down the engine's configuration-registry subsystem.
    pub async fn destroy(&self) -> Result<()> {
        trace!("ConfigManager::destroy");
        let result = self
            .gateway
            .invoke_void(4002, |native| native.config_mgr_destroy())
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

    // --- internal ----------------------------------------------------------

    /// Build a Config editor initialized with the parameters this manager
    /// was initialized with.
    async fn mint_config(&self) -> Result<Config> {
        let params = self.init_params.read().await.clone().ok_or_else(|| {
            SdkError::bad_input(
                kindred_core::error_id(COMPONENT_ID, 4006),
                "configuration manager is not initialized",
            )
        })?;
        let config = Config::new(self.gateway.native_api());
        config
            .initialize(
                &params.instance_name,
                &params.settings,
                params.verbose_logging,
            )
            .await?;
        Ok(config)
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
