//! # Radio Scan Source
//!
//! The contract the session manager consumes from a platform radio stack,
//! plus a listener registry sources can build on.

use crate::error::RadioError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Fields of a single observed advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAdvertisement {
    pub identity: String,
    pub name: Option<String>,
    pub rssi: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Advertisement(RawAdvertisement),
    /// The radio could not keep the scan queued by `start(episode)` running
    Failed { episode: u64, reason: String },
}

pub type DiscoveryHandler = Arc<dyn Fn(DiscoveryEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

/// A platform radio that can scan for advertisements.
///
/// `start` and `stop` return promptly and must not invoke handlers before
/// returning. A failure reported for a start carries the episode passed to
/// it. Events may keep arriving for a while after `stop`, and handlers are
/// allowed to call back into the source.
pub trait RadioScanSource: Send + Sync {
    fn subscribe(&self, handler: DiscoveryHandler) -> SubscriptionToken;

    fn unsubscribe(&self, token: SubscriptionToken);

    fn start(&self, episode: u64) -> Result<(), RadioError>;

    fn stop(&self) -> Result<(), RadioError>;
}

/// Ordered set of discovery handlers.
///
/// `emit` snapshots the handlers before calling them, so no lock is held
/// while a handler runs.
#[derive(Default)]
pub struct DiscoveryEmitter {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionToken, DiscoveryHandler)>>,
}

impl DiscoveryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, handler: DiscoveryHandler) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((token, handler));
        token
    }

    pub fn remove_listener(&self, token: SubscriptionToken) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(registered, _)| *registered != token);
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn emit(&self, event: DiscoveryEvent) {
        let snapshot: Vec<DiscoveryHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in snapshot {
            handler(event.clone());
        }
    }
}

/// Source used when no adapter could be acquired. Every start fails.
pub struct UnavailableRadio {
    reason: String,
    emitter: DiscoveryEmitter,
}

impl UnavailableRadio {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            emitter: DiscoveryEmitter::new(),
        }
    }
}

impl RadioScanSource for UnavailableRadio {
    fn subscribe(&self, handler: DiscoveryHandler) -> SubscriptionToken {
        self.emitter.add_listener(handler)
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.emitter.remove_listener(token);
    }

    fn start(&self, _episode: u64) -> Result<(), RadioError> {
        Err(RadioError::NotAvailable(self.reason.clone()))
    }

    fn stop(&self) -> Result<(), RadioError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_handler(count: Arc<AtomicUsize>) -> DiscoveryHandler {
        Arc::new(move |_event| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn advertisement(id: &str) -> DiscoveryEvent {
        DiscoveryEvent::Advertisement(RawAdvertisement {
            identity: id.to_string(),
            name: None,
            rssi: -50,
        })
    }

    #[test]
    fn test_emit_reaches_registered_listeners() {
        let emitter = DiscoveryEmitter::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let token = emitter.add_listener(counting_handler(first.clone()));
        emitter.add_listener(counting_handler(second.clone()));
        emitter.emit(advertisement("A"));

        emitter.remove_listener(token);
        emitter.remove_listener(token);
        emitter.emit(advertisement("B"));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.listener_count(), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let emitter = Arc::new(DiscoveryEmitter::new());
        let token_slot: Arc<Mutex<Option<SubscriptionToken>>> = Arc::new(Mutex::new(None));

        let handler: DiscoveryHandler = {
            let emitter = emitter.clone();
            let token_slot = token_slot.clone();
            Arc::new(move |_event| {
                if let Some(token) = token_slot.lock().unwrap().take() {
                    emitter.remove_listener(token);
                }
            })
        };
        let token = emitter.add_listener(handler);
        *token_slot.lock().unwrap() = Some(token);

        emitter.emit(advertisement("A"));
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_unavailable_radio_refuses_start() {
        let radio = UnavailableRadio::new("no adapter");
        assert_eq!(
            radio.start(1),
            Err(RadioError::NotAvailable("no adapter".to_string()))
        );
        assert!(radio.stop().is_ok());
    }
}
