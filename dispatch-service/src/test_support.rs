//! Subscriber doubles for coordinator and notifier tests.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::notifier::{DeliveryError, Subscriber};

/// Keeps every envelope it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    envelopes: Mutex<Vec<Value>>,
}

impl RecordingSubscriber {
    /// Envelopes received so far.
    #[must_use]
    pub fn envelopes(&self) -> Vec<Value> {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Envelope `type` tags received so far.
    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        self.envelopes()
            .iter()
            .filter_map(|envelope| envelope.get("type").and_then(Value::as_str))
            .map(str::to_owned)
            .collect()
    }
}

impl Subscriber for RecordingSubscriber {
    fn deliver(&self, envelope: &Value) -> Result<(), DeliveryError> {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
        Ok(())
    }
}

/// Rejects every delivery as if its connection had dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSubscriber;

impl Subscriber for FailingSubscriber {
    fn deliver(&self, _envelope: &Value) -> Result<(), DeliveryError> {
        Err(DeliveryError::Closed)
    }
}
