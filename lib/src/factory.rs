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

//! One place to construct every SDK component against a shared backend.
//!
//! The [`AbstractFactory`] holds the instance name, settings, and initial
//! configuration id, initializes each engine subsystem at most once no
//! matter how many components are created, and tears down exactly the
//! subsystems it initialized.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use log::{info, trace};
use tokio::sync::Mutex;

use kindred_core::{EmbeddedEngine, NativeApi, Result, SdkError};

use crate::config::Config;
use crate::configmanager::ConfigManager;
use crate::diagnostic::Diagnostic;
use crate::engine::Engine;
use crate::product::Product;

#[derive(Debug, Default)]
struct SubsystemFlags {
    config: bool,
    config_manager: bool,
    diagnostic: bool,
    engine: bool,
    product: bool,
}

/// Factory of SDK components sharing one backend and one set of
/// initialization parameters.
#[derive(Debug)]
pub struct AbstractFactory {
    instance_name: String,
    settings: String,
    config_id: AtomicI64,
    verbose_logging: i64,
    native: Arc<dyn NativeApi>,
    initialized: Mutex<SubsystemFlags>,
}

impl AbstractFactory {
    pub fn builder() -> AbstractFactoryBuilder {
        AbstractFactoryBuilder::new()
    }

    /// The backend every component from this factory shares.
    pub fn native_api(&self) -> Arc<dyn NativeApi> {
        self.native.clone()
    }

    /// Create a [`Config`] editor, initializing the configuration
    /// subsystem on first use.
    pub async fn create_config(&self) -> Result<Config> {
        trace!("AbstractFactory::create_config");
        let config = Config::new(self.native.clone());
        let mut flags = self.initialized.lock().await;
        if !flags.config {
            config
                .initialize(&self.instance_name, &self.settings, self.verbose_logging)
                .await
                .map_err(|e| SdkError::initialize("AbstractFactory::create_config", e))?;
            flags.config = true;
        }
        Ok(config)
    }

    /// Create a [`ConfigManager`], initializing the registry subsystem on
    /// first use.
    pub async fn create_config_manager(&self) -> Result<ConfigManager> {
        trace!("AbstractFactory::create_config_manager");
        let manager = ConfigManager::new(self.native.clone());
        let mut flags = self.initialized.lock().await;
        // The manager always records its init parameters so it can mint
        // Config editors, even when the subsystem itself is already up.
        manager
            .initialize(&self.instance_name, &self.settings, self.verbose_logging)
            .await
            .map_err(|e| SdkError::initialize("AbstractFactory::create_config_manager", e))?;
        flags.config_manager = true;
        Ok(manager)
    }

    /// Create a [`Diagnostic`], initializing the diagnostic subsystem on
    /// first use.
    pub async fn create_diagnostic(&self) -> Result<Diagnostic> {
        trace!("AbstractFactory::create_diagnostic");
        let diagnostic = Diagnostic::new(self.native.clone());
        let mut flags = self.initialized.lock().await;
        if !flags.diagnostic {
            diagnostic
                .initialize(
                    &self.instance_name,
                    &self.settings,
                    self.config_id.load(Ordering::SeqCst),
                    self.verbose_logging,
                )
                .await
                .map_err(|e| SdkError::initialize("AbstractFactory::create_diagnostic", e))?;
            flags.diagnostic = true;
        }
        Ok(diagnostic)
    }

    /// Create an [`Engine`], initializing the engine subsystem on first
    /// use.
    pub async fn create_engine(&self) -> Result<Engine> {
        trace!("AbstractFactory::create_engine");
        let engine = Engine::new(self.native.clone());
        let mut flags = self.initialized.lock().await;
        if !flags.engine {
            engine
                .initialize(
                    &self.instance_name,
                    &self.settings,
                    self.config_id.load(Ordering::SeqCst),
                    self.verbose_logging,
                )
                .await
                .map_err(|e| SdkError::initialize("AbstractFactory::create_engine", e))?;
            flags.engine = true;
        }
        Ok(engine)
    }

    /// Create a [`Product`], initializing the product subsystem on first
    /// use.
    pub async fn create_product(&self) -> Result<Product> {
        trace!("AbstractFactory::create_product");
        let product = Product::new(self.native.clone());
        let mut flags = self.initialized.lock().await;
        if !flags.product {
            product
                .initialize(&self.instance_name, &self.settings, self.verbose_logging)
                .await
                .map_err(|e| SdkError::initialize("AbstractFactory::create_product", e))?;
            flags.product = true;
        }
        Ok(product)
    }

    /// Move the factory and its already-initialized engine and diagnostic
    /// subsystems onto the configuration registered under `config_id`.
    pub async fn reinitialize(&self, config_id: i64) -> Result<()> {
        info!("AbstractFactory::reinitialize({config_id})");
        self.config_id.store(config_id, Ordering::SeqCst);
        let flags = self.initialized.lock().await;
        if flags.engine {
            Engine::new(self.native.clone()).reinitialize(config_id).await?;
        }
        if flags.diagnostic {
            Diagnostic::new(self.native.clone())
                .reinitialize(config_id)
                .await?;
        }
        Ok(())
    }

    /// Tear down every subsystem this factory initialized.
    pub async fn destroy(&self) -> Result<()> {
        info!("AbstractFactory::destroy");
        let mut flags = self.initialized.lock().await;
        if flags.engine {
            Engine::new(self.native.clone()).destroy().await?;
            flags.engine = false;
        }
        if flags.diagnostic {
            Diagnostic::new(self.native.clone()).destroy().await?;
            flags.diagnostic = false;
        }
        if flags.config_manager {
            ConfigManager::new(self.native.clone()).destroy().await?;
            flags.config_manager = false;
        }
        if flags.config {
            Config::new(self.native.clone()).destroy().await?;
            flags.config = false;
        }
        if flags.product {
            Product::new(self.native.clone()).destroy().await?;
            flags.product = false;
        }
        Ok(())
    }
}

/// Fluent builder for [`AbstractFactory`].
pub struct AbstractFactoryBuilder {
    instance_name: String,
    settings: String,
    config_id: i64,
    verbose_logging: i64,
    native: Option<Arc<dyn NativeApi>>,
}

impl AbstractFactoryBuilder {
    pub fn new() -> Self {
        Self {
            instance_name: "kindred-sdk".to_string(),
            settings: "{}".to_string(),
            config_id: 0,
            verbose_logging: 0,
            native: None,
        }
    }

    pub fn with_instance_name(mut self, instance_name: impl Into<String>) -> Self {
        self.instance_name = instance_name.into();
        self
    }

    pub fn with_settings(mut self, settings: impl Into<String>) -> Self {
        self.settings = settings.into();
        self
    }

    /// Start against a specific registered configuration instead of the
    /// repository default.
    pub fn with_config_id(mut self, config_id: i64) -> Self {
        self.config_id = config_id;
        self
    }

    pub fn with_verbose_logging(mut self, verbose_logging: i64) -> Self {
        self.verbose_logging = verbose_logging;
        self
    }

    /// Swap in a backend. Defaults to the embedded in-process engine.
    pub fn with_native_api(mut self, native: Arc<dyn NativeApi>) -> Self {
        self.native = Some(native);
        self
    }

    pub fn build(self) -> AbstractFactory {
        AbstractFactory {
            instance_name: self.instance_name,
            settings: self.settings,
            config_id: AtomicI64::new(self.config_id),
            verbose_logging: self.verbose_logging,
            native: self
                .native
                .unwrap_or_else(|| Arc::new(EmbeddedEngine::new())),
            initialized: Mutex::new(SubsystemFlags::default()),
        }
    }
}

impl Default for AbstractFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
