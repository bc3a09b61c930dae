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

//! Factory lifecycle tests: component creation, init-once behavior,
//! reinitialization, and teardown.

use kindred_sdk::{AbstractFactory, ErrorKind};

const DEFINITION: &str = r#"{"G2_CONFIG":{"CFG_DSRC":[]}}"#;

#[tokio::test]
async fn test_components_share_one_backend() {
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .build();

    let manager = factory.create_config_manager().await.unwrap();
    let engine = factory.create_engine().await.unwrap();

    // A configuration registered through the manager is visible to the
    // engine after reinitialization, proving both talk to one backend.
    let config_id = manager.register_config(DEFINITION, "shared").await.unwrap();
    engine.reinitialize(config_id).await.unwrap();
    assert_eq!(engine.get_active_config_id().await.unwrap(), config_id);
}

#[tokio::test]
async fn test_create_is_idempotent_per_subsystem() {
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .build();

    let first = factory.create_product().await.unwrap();
    let second = factory.create_product().await.unwrap();
    assert!(first.get_version().await.is_ok());
    assert!(second.get_version().await.is_ok());
}

#[tokio::test]
async fn test_build_with_malformed_settings_fails_component_creation() {
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .with_settings("}{")
        .build();

    let error = factory.create_product().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);
    assert!(error.to_string().contains("create_product"));
}

#[tokio::test]
async fn test_factory_reinitialize_moves_engine_config() {
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .build();

    let manager = factory.create_config_manager().await.unwrap();
    let engine = factory.create_engine().await.unwrap();
    let diagnostic = factory.create_diagnostic().await.unwrap();

    let config_id = manager.register_config(DEFINITION, "next").await.unwrap();
    factory.reinitialize(config_id).await.unwrap();
    assert_eq!(engine.get_active_config_id().await.unwrap(), config_id);
    // Diagnostic shares the backend and must still answer after the switch.
    assert!(diagnostic.get_datastore_info().await.is_ok());
}

#[tokio::test]
async fn test_reinitialize_to_unregistered_id_fails() {
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .build();

    factory.create_engine().await.unwrap();
    let error = factory.reinitialize(424242).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_partial_failure_leaves_earlier_components_usable() {
    // Pin the factory to a configuration id that is never registered: the
    // engine refuses to initialize on it, but product does not take a
    // configuration id and comes up fine.
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .with_config_id(424242)
        .build();

    let product = factory.create_product().await.unwrap();
    let error = factory.create_engine().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);
    assert!(error.to_string().contains("create_engine"));

    // No rollback of the already-created component.
    assert!(product.get_version().await.is_ok());
}

#[tokio::test]
async fn test_destroy_tears_down_initialized_subsystems() {
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .build();

    let product = factory.create_product().await.unwrap();
    assert!(product.get_version().await.is_ok());

    factory.destroy().await.unwrap();

    // The subsystem is down; further calls fail as unrecoverable.
    let error = product.get_version().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unrecoverable);
}

#[tokio::test]
async fn test_destroy_without_components_is_no_op() {
    let factory = AbstractFactory::builder()
        .with_instance_name("factory-test")
        .build();
    factory.destroy().await.unwrap();
}

#[tokio::test]
async fn test_builder_with_config_id_initializes_engine_on_it() {
    // Seed a backend with a registered configuration first, then build a
    // second factory pinned to that id over the same backend.
    let seed = AbstractFactory::builder()
        .with_instance_name("factory-seed")
        .build();
    let manager = seed.create_config_manager().await.unwrap();
    let config_id = manager.register_config(DEFINITION, "pinned").await.unwrap();

    let pinned = AbstractFactory::builder()
        .with_instance_name("factory-pinned")
        .with_config_id(config_id)
        .with_native_api(seed.native_api())
        .build();
    let engine = pinned.create_engine().await.unwrap();
    assert_eq!(engine.get_active_config_id().await.unwrap(), config_id);
}
