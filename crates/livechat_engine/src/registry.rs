use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use livechat_core::ChatMessage;

use crate::{ListenerError, ObserverError};

/// Receives every newly seen chat message, synchronously and in order.
pub trait ChatObserver: Send + Sync {
    fn on_message(&self, message: &ChatMessage) -> Result<(), ObserverError>;
}

impl<F> ChatObserver for F
where
    F: Fn(&ChatMessage) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_message(&self, message: &ChatMessage) -> Result<(), ObserverError> {
        self(message)
    }
}

pub type ErrorHandler = Arc<dyn Fn(&ListenerError) + Send + Sync>;

/// Ordered set of observers plus the handlers that hear about failures.
///
/// Identity is the `Arc` allocation: registering the same `Arc` twice is a
/// no-op, while two separately allocated equal closures are distinct.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn ChatObserver>>,
    error_handlers: Vec<ErrorHandler>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the observer was already registered.
    pub fn register(&mut self, observer: Arc<dyn ChatObserver>) -> bool {
        if self.position(&observer).is_some() {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Returns `false` if the observer was not registered.
    pub fn remove(&mut self, observer: &Arc<dyn ChatObserver>) -> bool {
        match self.position(observer) {
            Some(idx) => {
                self.observers.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn add_error_handler(&mut self, handler: ErrorHandler) {
        self.error_handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Hands `message` to every observer in registration order.
    ///
    /// An observer that fails or panics is reported and skipped; the rest
    /// still receive the message.
    pub fn deliver(&self, message: &ChatMessage) -> Vec<ListenerError> {
        self.observers
            .iter()
            .filter_map(|observer| {
                let outcome = catch_unwind(AssertUnwindSafe(|| observer.on_message(message)));
                let reason = match outcome {
                    Ok(Ok(())) => return None,
                    Ok(Err(err)) => err.to_string(),
                    Err(payload) => format!("panicked: {}", panic_reason(payload.as_ref())),
                };
                Some(ListenerError::Observer {
                    message_id: message.id.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// Passes `error` to every error handler. Handler panics are swallowed.
    pub fn report(&self, error: &ListenerError) {
        for handler in &self.error_handlers {
            let _ = catch_unwind(AssertUnwindSafe(|| handler(error)));
        }
    }

    fn position(&self, observer: &Arc<dyn ChatObserver>) -> Option<usize> {
        let target = Arc::as_ptr(observer) as *const ();
        self.observers
            .iter()
            .position(|existing| Arc::as_ptr(existing) as *const () == target)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
