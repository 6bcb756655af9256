//! In-process message bus connecting the background and popup contexts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::messages::{Context, Envelope};

/// Routes envelopes to the single listener registered for their `to` context.
/// Sending is fire-and-forget: an absent or closed listener just drops the envelope.
#[derive(Clone, Default)]
pub struct MessageBus {
    listeners: Arc<Mutex<HashMap<Context, UnboundedSender<Envelope>>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the listener for `context`, replacing (and disconnecting) any previous one.
    pub fn listen(&self, context: Context) -> UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context, tx);
        if previous.is_some() {
            log::debug!("Replaced existing {:?} listener", context);
        }
        rx
    }

    /// Drops the listener for `context`; its receiver sees the channel close.
    pub fn close(&self, context: Context) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&context);
    }

    /// Delivers `envelope` and reports whether a live listener accepted it.
    pub fn send(&self, envelope: Envelope) -> bool {
        let to = envelope.to;
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(listener) = listeners.get(&to) else {
            log::debug!("No {:?} listener, dropping message", to);
            return false;
        };
        if listener.send(envelope).is_err() {
            log::debug!("{:?} listener is gone, dropping message", to);
            listeners.remove(&to);
            return false;
        }
        true
    }
}
