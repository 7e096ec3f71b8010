//! Dynamic value watch.
//!
//! Streams every change of one remote key to a single consumer:
//! - One poll worker owns the blocking-query loop
//! - One supervisor decides how the subscription ends
//! - Delivery holds at most one in-flight value

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{RemoteError, WatchError};
use crate::domain::ports::RemoteKv;

/// Latest payload of the watched key; `None` means the key was deleted.
pub type Update = Option<Vec<u8>>;

/// A live watch on one remote key.
///
/// Cancellation is cooperative: the worker notices a stop between blocking
/// queries, so shutdown can take up to the store's long-poll timeout.
/// Dropping the subscription stops the worker the same way.
#[derive(Debug)]
pub struct Subscription {
    key: String,
    updates: mpsc::Receiver<Update>,
    stop: CancellationToken,
    supervisor: Option<JoinHandle<Result<(), WatchError>>>,
}

/// Start watching `key`.
///
/// Returns as soon as the background tasks are spawned. The subscription
/// ends when `cancel` fires, when [`Subscription::stop`] is called, or when
/// a blocking query fails.
pub fn watch_key(
    client: Arc<dyn RemoteKv>,
    cancel: CancellationToken,
    key: impl Into<String>,
) -> Result<Subscription, WatchError> {
    let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
    let key = key.into();
    let (tx, rx) = mpsc::channel(1);
    let stop = cancel.child_token();

    let worker = runtime.spawn(poll_loop(client, key.clone(), tx, stop.clone()));
    let supervisor = runtime.spawn(supervise(worker, stop.clone(), key.clone()));

    tracing::debug!(key = %key, "watch started");

    Ok(Subscription {
        key,
        updates: rx,
        stop,
        supervisor: Some(supervisor),
    })
}

/// Blocking-query loop; exits on stop, on a closed receiver, or on error.
///
/// The store index is only the blocking cursor. A payload is delivered when
/// the key's own version or presence differs from what was last sent.
async fn poll_loop(
    client: Arc<dyn RemoteKv>,
    key: String,
    tx: mpsc::Sender<Update>,
    stop: CancellationToken,
) -> Result<(), RemoteError> {
    let mut last_index = 0u64;
    // `None` until the first delivery; then the modify index sent, if any.
    let mut delivered: Option<Option<u64>> = None;

    loop {
        if stop.is_cancelled() {
            return Ok(());
        }
        if tx.is_closed() {
            tracing::debug!(key = %key, "watch receiver closed");
            return Ok(());
        }

        let response = client.watch(&key, last_index).await?;
        last_index = if response.index < last_index {
            0
        } else {
            response.index
        };

        let version = response.pair.as_ref().map(|pair| pair.modify_index);
        if delivered == Some(version) {
            tracing::trace!(key = %key, index = last_index, "watch returned without change");
            continue;
        }

        delivered = Some(version);
        let payload = response.pair.map(|pair| pair.value);
        tokio::select! {
            _ = stop.cancelled() => return Ok(()),
            sent = tx.send(payload) => {
                if sent.is_err() {
                    tracing::debug!(key = %key, "watch receiver dropped");
                    return Ok(());
                }
            }
        }
    }
}

async fn supervise(
    mut worker: JoinHandle<Result<(), RemoteError>>,
    stop: CancellationToken,
    key: String,
) -> Result<(), WatchError> {
    tokio::select! {
        _ = stop.cancelled() => {
            tracing::debug!(key = %key, "watch stopped");
            match worker.await {
                Ok(Err(err)) => {
                    tracing::debug!(key = %key, error = %err, "watch loop failed after stop");
                }
                Err(err) if err.is_panic() => {
                    tracing::error!(key = %key, error = %err, "watch worker panicked");
                }
                _ => {}
            }
            Ok(())
        }
        joined = &mut worker => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                tracing::error!(key = %key, error = %err, "watch loop failed");
                Err(WatchError::Remote(err))
            }
            Err(err) => {
                tracing::error!(key = %key, error = %err, "watch worker aborted");
                Err(WatchError::Worker(err.to_string()))
            }
        },
    }
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next update, or `None` once the subscription has closed.
    pub async fn recv(&mut self) -> Option<Update> {
        self.updates.recv().await
    }

    /// Ask the worker to stop after its current blocking query.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Wait for the subscription to end and report why.
    ///
    /// `Ok(())` after cancellation or [`stop`](Self::stop); the loop's error
    /// otherwise. Pending updates are discarded, and the worker exits after
    /// its current blocking query even if nothing else stops it.
    pub async fn closed(mut self) -> Result<(), WatchError> {
        self.updates.close();
        match self.supervisor.take() {
            Some(supervisor) => supervisor
                .await
                .map_err(|err| WatchError::Worker(err.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Stream for Subscription {
    type Item = Update;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().updates.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
