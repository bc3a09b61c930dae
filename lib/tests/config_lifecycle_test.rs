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

//! Lifecycle tests for the in-memory configuration editor: handles, data
//! source editing, and export round trips.

use kindred_sdk::{AbstractFactory, ErrorKind};
use serde_json::Value;

async fn factory() -> AbstractFactory {
    let _ = env_logger::builder().is_test(true).try_init();
    AbstractFactory::builder()
        .with_instance_name("config-lifecycle-test")
        .build()
}

#[tokio::test]
async fn test_create_and_close_handle() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    config.close_config(handle).await.unwrap();

    // Second close answers a bad-input error without reaching the engine.
    let error = config.close_config(handle).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BadInput);
    assert!(error.to_string().contains("KNSDK6001"));
}

#[tokio::test]
async fn test_operations_on_closed_handle_fail() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    config.close_config(handle).await.unwrap();

    assert!(config.add_data_source(handle, "CUSTOMERS").await.is_err());
    assert!(config.get_data_sources(handle).await.is_err());
    assert!(config.export_config(handle).await.is_err());
}

#[tokio::test]
async fn test_template_contains_reserved_data_sources() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    let listing = config.get_data_sources(handle).await.unwrap();
    assert!(listing.contains("\"DSRC_CODE\":\"TEST\""));
    assert!(listing.contains("\"DSRC_CODE\":\"SEARCH\""));
}

#[tokio::test]
async fn test_add_data_source_appears_in_export() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    let fragment = config.add_data_source(handle, "CUSTOMERS").await.unwrap();
    assert!(fragment.contains("DSRC_ID"));

    let exported = config.export_config(handle).await.unwrap();
    assert!(exported.contains("\"DSRC_CODE\":\"CUSTOMERS\""));
}

#[tokio::test]
async fn test_add_duplicate_data_source_returns_same_id() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    let first = config.add_data_source(handle, "WATCHLIST").await.unwrap();
    let second = config.add_data_source(handle, "WATCHLIST").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_add_rejects_empty_code() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    let error = config.add_data_source(handle, "").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BadInput);
}

#[tokio::test]
async fn test_delete_absent_data_source_is_no_op() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    let before = config.export_config(handle).await.unwrap();
    config.delete_data_source(handle, "NOT_THERE").await.unwrap();
    let after = config.export_config(handle).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_delete_then_list_drops_data_source() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    config.add_data_source(handle, "CUSTOMERS").await.unwrap();
    config.delete_data_source(handle, "CUSTOMERS").await.unwrap();
    let listing = config.get_data_sources(handle).await.unwrap();
    assert!(!listing.contains("CUSTOMERS"));
}

#[tokio::test]
async fn test_import_export_round_trip_is_deep_equal() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let handle = config.create_config().await.unwrap();
    config.add_data_source(handle, "CUSTOMERS").await.unwrap();
    let exported = config.export_config(handle).await.unwrap();
    config.close_config(handle).await.unwrap();

    let reimported = config.import_config(&exported).await.unwrap();
    let round_tripped = config.export_config(reimported).await.unwrap();

    let original: Value = serde_json::from_str(&exported).unwrap();
    let re_exported: Value = serde_json::from_str(&round_tripped).unwrap();
    assert_eq!(original, re_exported);
}

#[tokio::test]
async fn test_import_rejects_malformed_definition() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let error = config.import_config("}{").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);

    let error = config.import_config("{\"OTHER\": 1}").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_handles_are_independent() {
    let factory = factory().await;
    let config = factory.create_config().await.unwrap();

    let first = config.create_config().await.unwrap();
    let second = config.create_config().await.unwrap();
    assert_ne!(first, second);

    config.add_data_source(first, "ONLY_FIRST").await.unwrap();
    let second_listing = config.get_data_sources(second).await.unwrap();
    assert!(!second_listing.contains("ONLY_FIRST"));
}
