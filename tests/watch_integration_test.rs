//! Integration tests for dynamic values over the in-memory store
//!
//! The store's blocking queries time out quickly so cancellation is
//! observed within a few polls.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{setup_test_logging, MemoryKv};
use futures::StreamExt;
use strata::domain::errors::RemoteError;
use strata::infrastructure::providers::RemoteKvProvider;
use strata::{RemoteKv, WatchError};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

fn provider(kv: &Arc<MemoryKv>) -> RemoteKvProvider {
    RemoteKvProvider::new(Some(kv.clone() as Arc<dyn RemoteKv>), "config")
}

#[tokio::test]
async fn test_streams_writes_and_deletion() {
    setup_test_logging();

    let kv = MemoryKv::new();
    kv.put("config/feature", "on");

    let mut sub = provider(&kv)
        .dynamic_value(CancellationToken::new(), "feature")
        .unwrap();
    assert_eq!(sub.key(), "config/feature");

    let first = timeout(WAIT, sub.recv()).await.unwrap();
    assert_eq!(first, Some(Some(b"on".to_vec())));

    kv.put("config/feature", "off");
    let second = timeout(WAIT, sub.recv()).await.unwrap();
    assert_eq!(second, Some(Some(b"off".to_vec())));

    kv.delete("config/feature");
    let third = timeout(WAIT, sub.recv()).await.unwrap();
    assert_eq!(third, Some(None));

    sub.stop();
    assert!(timeout(WAIT, sub.closed()).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_missing_key_reports_none_first() {
    let kv = MemoryKv::new();
    let mut sub = provider(&kv)
        .dynamic_value(CancellationToken::new(), "absent")
        .unwrap();

    assert_eq!(timeout(WAIT, sub.next()).await.unwrap(), Some(None));
}

#[tokio::test]
async fn test_cancel_closes_cleanly() {
    let kv = MemoryKv::new();
    kv.put("config/feature", "on");
    let cancel = CancellationToken::new();

    let mut sub = provider(&kv).dynamic_value(cancel.clone(), "feature").unwrap();
    assert!(timeout(WAIT, sub.recv()).await.unwrap().is_some());

    cancel.cancel();
    assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), None);
    assert!(timeout(WAIT, sub.closed()).await.unwrap().is_ok());
}

#[tokio::test]
async fn test_store_failure_ends_subscription_with_error() {
    let kv = MemoryKv::new();
    kv.put("config/feature", "on");

    let mut sub = provider(&kv)
        .dynamic_value(CancellationToken::new(), "feature")
        .unwrap();
    assert!(timeout(WAIT, sub.recv()).await.unwrap().is_some());

    kv.fail_watch_with(|| RemoteError::Status {
        key: "config/feature".into(),
        status: 500,
    });
    assert_eq!(timeout(WAIT, sub.recv()).await.unwrap(), None);

    let err = timeout(WAIT, sub.closed()).await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        WatchError::Remote(RemoteError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_dropping_subscription_leaves_token_alone() {
    let kv = MemoryKv::new();
    kv.put("config/feature", "on");
    let cancel = CancellationToken::new();

    let sub = provider(&kv).dynamic_value(cancel.clone(), "feature").unwrap();
    drop(sub);

    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn test_dynamic_value_needs_client() {
    let err = RemoteKvProvider::new(None, "config")
        .dynamic_value(CancellationToken::new(), "feature")
        .unwrap_err();
    assert!(matches!(err, WatchError::NoClient(_)));
}

#[tokio::test]
async fn test_unrelated_write_is_not_delivered() {
    let kv = MemoryKv::new();
    kv.put("config/feature", "on");

    let mut sub = provider(&kv)
        .dynamic_value(CancellationToken::new(), "feature")
        .unwrap();
    assert_eq!(
        timeout(WAIT, sub.recv()).await.unwrap(),
        Some(Some(b"on".to_vec()))
    );

    kv.put("config/other", "x");
    assert!(timeout(Duration::from_millis(300), sub.recv()).await.is_err());

    kv.put("config/feature", "off");
    assert_eq!(
        timeout(WAIT, sub.recv()).await.unwrap(),
        Some(Some(b"off".to_vec()))
    );
    sub.stop();
}

#[tokio::test]
async fn test_closed_without_stop_returns() {
    let kv = MemoryKv::new();
    kv.put("config/feature", "on");

    let mut sub = provider(&kv)
        .dynamic_value(CancellationToken::new(), "feature")
        .unwrap();
    assert!(timeout(WAIT, sub.recv()).await.unwrap().is_some());

    assert!(timeout(WAIT, sub.closed()).await.unwrap().is_ok());
}
