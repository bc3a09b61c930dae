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

//! Typed SDK over the Kindred entity-resolution engine.
//!
//! Components are created through the [`AbstractFactory`]:
//!
//! ```no_run
//! use kindred_sdk::AbstractFactory;
//!
//! # async fn example() -> kindred_sdk::Result<()> {
//! let factory = AbstractFactory::builder()
//!     .with_instance_name("example")
//!     .build();
//! let product = factory.create_product().await?;
//! println!("{}", product.get_version().await?);
//! factory.destroy().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Component Modules
// ============================================================================

/// In-memory configuration editing over engine handles
pub mod config;

/// Durable configuration registry and default-id management
pub mod configmanager;

/// Datastore inspection and maintenance
pub mod diagnostic;

/// The resolution engine lifecycle and statistics
pub mod engine;

/// License and version metadata
pub mod product;

/// Component construction with shared init-once lifecycle
pub mod factory;

// ============================================================================
// Clean Public API
// ============================================================================

pub use config::Config;
pub use configmanager::ConfigManager;
pub use diagnostic::Diagnostic;
pub use engine::Engine;
pub use factory::{AbstractFactory, AbstractFactoryBuilder};
pub use product::Product;

/// Re-exported core types callers need at the API surface.
pub use kindred_core::{
    ConfigHandle, EmbeddedEngine, ErrorKind, NativeApi, NotificationEvent, Observer, Result,
    SdkError,
};
