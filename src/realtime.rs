use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::client::Client;
use crate::error::Result;
use crate::types::ChangeEvent;

/// Derives the channel name for a table's change stream. The
/// `<table>_changes` convention is an interop contract with the
/// notification backend; do not vary it.
#[must_use]
pub fn channel_name(table: &str) -> String {
    format!("{table}_changes")
}

/// Opens and closes per-table change channels, forwarding every
/// insert/update/delete event to the registered listener.
///
/// Subscriptions are independent; closing one never affects another.
/// There is no reconnection here: if the transport drops, re-subscribing
/// is the caller's (or an outer collaborator's) job.
#[derive(Clone)]
pub struct ChangeNotifier {
    client: Arc<dyn Client>,
}

/// A live binding of one table channel to one callback.
/// Created → Active on [`ChangeNotifier::subscribe`] returning,
/// Active → Closed only via [`ChangeNotifier::unsubscribe`].
pub struct Subscription {
    channel: String,
    forwarder: JoinHandle<()>,
    closed: AtomicBool,
}

impl Subscription {
    /// The channel this subscription is bound to.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Stops the forwarder if the handle is dropped without an
        // explicit unsubscribe. The channel itself stays open until
        // the client is told otherwise.
        self.forwarder.abort();
    }
}

impl ChangeNotifier {
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }

    /// Opens the change channel for `table` and invokes `callback` for
    /// each event. The subscription is active once this returns;
    /// delivery of individual events may lag behind the writes that
    /// caused them.
    ///
    /// At most one subscription per (table, callback) pair is assumed;
    /// duplicates are not detected here and will each receive every
    /// event.
    pub async fn subscribe<F>(&self, table: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let channel = channel_name(table);
        let mut rx = self.client.open_channel(&channel, table).await?;
        tracing::debug!(channel, "subscribed");

        let name = channel.clone();
        let forwarder = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callback(event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = %name, skipped, "listener lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription {
            channel,
            forwarder,
            closed: AtomicBool::new(false),
        })
    }

    /// Releases a subscription and stops further callback invocation.
    /// Idempotent: a second call on the same handle is a no-op.
    pub async fn unsubscribe(&self, subscription: &Subscription) {
        if subscription.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(channel = %subscription.channel, "already unsubscribed");
            return;
        }

        subscription.forwarder.abort();
        if let Err(e) = self.client.close_channel(&subscription.channel).await {
            tracing::debug!(channel = %subscription.channel, error = %e, "close channel failed");
        }
    }
}
