//! Fan-out of dispatch events to live subscribers.
//!
//! Delivery is best effort. [`ChangeNotifier::publish`] hands the JSON
//! envelope to every subscriber registered at that moment, records which
//! deliveries failed and carries on. A failing subscriber stays registered
//! until its owner removes it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use dispatch_core::DispatchEvent;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Why one delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The subscriber's transport is gone.
    #[error("subscriber is closed")]
    Closed,
    /// The subscriber refused the envelope.
    #[error("subscriber rejected the event: {message}")]
    Rejected {
        /// Reason given by the subscriber.
        message: String,
    },
    /// The event could not be rendered as JSON.
    #[error("failed to encode event: {message}")]
    Encode {
        /// Encoder failure description.
        message: String,
    },
}

/// Receiver of event envelopes, typically one live connection.
pub trait Subscriber: Send + Sync {
    /// Deliver one `{"type": ..., "data": ...}` envelope.
    ///
    /// Must not block; slow transports should buffer or reject.
    fn deliver(&self, envelope: &Value) -> Result<(), DeliveryError>;
}

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

/// One failed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Subscriber that failed.
    pub subscriber: SubscriberId,
    /// What went wrong.
    pub error: DeliveryError,
}

/// Outcome of one [`ChangeNotifier::publish`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Envelope `type` of the published event.
    pub kind: &'static str,
    /// Subscribers that accepted the envelope.
    pub delivered: usize,
    /// Subscribers that did not.
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    /// Whether every subscriber accepted the envelope.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of subscribers and the publish entry point.
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn Subscriber>)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl ChangeNotifier {
    /// Register `subscriber` for every subsequent event.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, subscriber));
        id
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(registered, _)| *registered != id);
        subscribers.len() != before
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Never fails. Individual delivery failures are logged and returned in
    /// the report.
    pub fn publish(&self, event: &DispatchEvent) -> DeliveryReport {
        let targets: Vec<(SubscriberId, Arc<dyn Subscriber>)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let kind = event.kind();

        let outcomes: Vec<(SubscriberId, Result<(), DeliveryError>)> = match event.to_envelope()
        {
            Ok(envelope) => targets
                .iter()
                .map(|(id, subscriber)| (*id, subscriber.deliver(&envelope)))
                .collect(),
            Err(err) => {
                let error = DeliveryError::Encode {
                    message: err.to_string(),
                };
                targets
                    .iter()
                    .map(|(id, _)| (*id, Err(error.clone())))
                    .collect()
            }
        };

        let mut report = DeliveryReport {
            kind,
            delivered: 0,
            failures: Vec::new(),
        };
        for (subscriber, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    log::warn!("failed to deliver {kind} to subscriber {}: {error}", subscriber.0);
                    report.failures.push(DeliveryFailure { subscriber, error });
                }
            }
        }
        report
    }
}

/// Forwards envelopes into a bounded Tokio channel.
///
/// The transport layer drains the receiver, typically one per connection.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    sender: mpsc::Sender<Value>,
}

impl ChannelSubscriber {
    /// Wrap an existing sender.
    #[must_use]
    pub const fn new(sender: mpsc::Sender<Value>) -> Self {
        Self { sender }
    }

    /// Create a subscriber and the receiver it feeds.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Value>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(sender), receiver)
    }
}

impl Subscriber for ChannelSubscriber {
    fn deliver(&self, envelope: &Value) -> Result<(), DeliveryError> {
        self.sender
            .try_send(envelope.clone())
            .map_err(|err| match err {
                TrySendError::Full(_) => DeliveryError::Rejected {
                    message: "channel is full".to_owned(),
                },
                TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }
}
