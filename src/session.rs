//! # Scan Session Module
//!
//! Owns the idle/scanning lifecycle of a scan session, the deduplicated
//! result table, and the single subscription to the radio.
//!
//! ## Key Components
//! - `ScanSessionManager`: clonable handle used by the UI and by tasks
//! - `SessionUpdate`: notifications pushed to the presentation layer
//!
//! ## Concurrency
//! State and results live behind one mutex. Discovery callbacks from the
//! radio thread and start/stop calls from the UI all go through it. The
//! permission gate is awaited with the lock released, so a `stop()` issued
//! meanwhile cancels the pending start instead of waiting behind it.

use crate::error::ScanError;
use crate::peripheral::{Peripheral, ResultSet};
use crate::permission::{Capability, PermissionGate};
use crate::radio::{DiscoveryEvent, DiscoveryHandler, RadioScanSource, SubscriptionToken};
use crossbeam_channel::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    StateChanged(SessionState),
    Discovered(Peripheral),
    Warning(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A start was already pending or a scan is running
    AlreadyActive,
    /// `stop()` was called while permissions were being requested
    Superseded,
}

struct Inner {
    state: SessionState,
    results: ResultSet,
    subscription: Option<SubscriptionToken>,
    /// Ticket of the start currently waiting on the permission gate
    pending_start: Option<u64>,
    /// Ticket of the running (or last) scanning episode
    episode: u64,
    next_ticket: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    radio: Arc<dyn RadioScanSource>,
    gate: Arc<dyn PermissionGate>,
    capabilities: Vec<Capability>,
    updates: Option<Sender<SessionUpdate>>,
    log_discoveries: bool,
}

/// Manages one scan session at a time.
///
/// Clones share the same session. When the last clone is dropped while
/// scanning, the radio subscription is removed and the radio is stopped.
#[derive(Clone)]
pub struct ScanSessionManager {
    shared: Arc<Shared>,
}

impl ScanSessionManager {
    #[cfg(test)]
    pub fn new(
        radio: Arc<dyn RadioScanSource>,
        gate: Arc<dyn PermissionGate>,
        capabilities: Vec<Capability>,
    ) -> Self {
        Self::build(radio, gate, capabilities, None, true)
    }

    /// Creates a manager that also pushes `SessionUpdate`s to `updates`.
    pub fn with_updates(
        radio: Arc<dyn RadioScanSource>,
        gate: Arc<dyn PermissionGate>,
        capabilities: Vec<Capability>,
        updates: Sender<SessionUpdate>,
        log_discoveries: bool,
    ) -> Self {
        Self::build(radio, gate, capabilities, Some(updates), log_discoveries)
    }

    fn build(
        radio: Arc<dyn RadioScanSource>,
        gate: Arc<dyn PermissionGate>,
        capabilities: Vec<Capability>,
        updates: Option<Sender<SessionUpdate>>,
        log_discoveries: bool,
    ) -> Self {
        let inner = Inner {
            state: SessionState::Idle,
            results: ResultSet::new(),
            subscription: None,
            pending_start: None,
            episode: 0,
            next_ticket: 0,
        };

        ScanSessionManager {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                radio,
                gate,
                capabilities,
                updates,
                log_discoveries,
            }),
        }
    }

    /// Requests permissions, then starts a new scanning episode.
    ///
    /// Ignored unless the session is idle with no other start pending.
    /// On success the result set has been cleared and the radio started.
    pub async fn start(&self) -> Result<StartOutcome, ScanError> {
        let pending = match self.shared.reserve_start() {
            Some(pending) => pending,
            None => {
                log::debug!("Start ignored: session is not idle");
                return Ok(StartOutcome::AlreadyActive);
            }
        };

        let granted = self.shared.gate.request(&self.shared.capabilities).await;
        let outcome = self.shared.begin_episode(pending.ticket, granted);
        drop(pending);
        outcome
    }

    /// Stops the running scan, or cancels a start still waiting on permissions.
    ///
    /// The session always ends up idle. A radio stop failure is reported
    /// after the transition.
    pub fn stop(&self) -> Result<(), ScanError> {
        let mut inner = self.shared.lock();
        if inner.pending_start.take().is_some() {
            log::info!("Pending scan start cancelled");
        }
        if inner.state == SessionState::Idle {
            return Ok(());
        }
        self.shared.end_episode(&mut inner)
    }

    /// Snapshot of the current episode's peripherals in discovery order
    pub fn current_results(&self) -> Vec<Peripheral> {
        self.shared.lock().results.to_vec()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn is_scanning(&self) -> bool {
        self.state() == SessionState::Scanning
    }
}

/// Holds a start reservation while the permission gate is awaited.
///
/// Dropping it releases the reservation if nothing else claimed it, which
/// covers a start future that is dropped before the gate resolves.
struct PendingStart<'a> {
    shared: &'a Shared,
    ticket: u64,
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if inner.pending_start == Some(self.ticket) {
            inner.pending_start = None;
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, update: SessionUpdate) {
        if let Some(updates) = &self.updates {
            let _ = updates.send(update);
        }
    }

    fn reserve_start(&self) -> Option<PendingStart<'_>> {
        let mut inner = self.lock();
        if inner.state != SessionState::Idle || inner.pending_start.is_some() {
            return None;
        }
        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        inner.pending_start = Some(ticket);
        Some(PendingStart { shared: self, ticket })
    }

    fn begin_episode(self: &Arc<Self>, ticket: u64, granted: bool) -> Result<StartOutcome, ScanError> {
        let mut inner = self.lock();
        if inner.pending_start != Some(ticket) {
            log::info!("Scan start superseded by stop");
            return Ok(StartOutcome::Superseded);
        }
        inner.pending_start = None;

        if !granted {
            let error = ScanError::PermissionDenied;
            log::warn!("{}", error);
            self.notify(SessionUpdate::Warning(error.to_string()));
            return Err(error);
        }

        inner.results.clear();
        inner.state = SessionState::Scanning;
        inner.episode = ticket;
        let token = self.radio.subscribe(self.handler(ticket));

        if let Err(e) = self.radio.start(ticket) {
            self.radio.unsubscribe(token);
            inner.state = SessionState::Idle;
            let error = ScanError::RadioStartFailure(e);
            log::error!("{}", error);
            self.notify(SessionUpdate::Error(error.to_string()));
            return Err(error);
        }

        inner.subscription = Some(token);
        log::info!("Scanning started");
        self.notify(SessionUpdate::StateChanged(SessionState::Scanning));
        Ok(StartOutcome::Started)
    }

    /// Unsubscribes, forces `Idle`, then stops the radio. Caller checks the session is scanning.
    fn end_episode(&self, inner: &mut Inner) -> Result<(), ScanError> {
        if let Some(token) = inner.subscription.take() {
            self.radio.unsubscribe(token);
        }
        inner.state = SessionState::Idle;
        if inner.results.is_empty() {
            log::info!("Scanning stopped, no peripherals found");
        } else {
            log::info!("Scanning stopped, {} peripherals found", inner.results.len());
        }
        self.notify(SessionUpdate::StateChanged(SessionState::Idle));

        self.radio.stop().map_err(|e| {
            let error = ScanError::RadioStopFailure(e);
            log::error!("{}", error);
            self.notify(SessionUpdate::Error(error.to_string()));
            error
        })
    }

    fn handler(self: &Arc<Self>, ticket: u64) -> DiscoveryHandler {
        let shared: Weak<Shared> = Arc::downgrade(self);
        Arc::new(move |event| {
            if let Some(shared) = shared.upgrade() {
                shared.on_discovery(ticket, event);
            }
        })
    }

    fn on_discovery(&self, ticket: u64, event: DiscoveryEvent) {
        let mut inner = self.lock();
        if inner.state != SessionState::Scanning || inner.episode != ticket {
            log::trace!("Ignoring discovery event outside its scanning episode");
            return;
        }

        match event {
            DiscoveryEvent::Advertisement(raw) => match inner.results.record(raw) {
                Ok(Some(peripheral)) => {
                    let peripheral = peripheral.clone();
                    if self.log_discoveries {
                        log::info!(
                            "Device: {}, Address: {}, RSSI: {}",
                            peripheral.display_name.as_deref().unwrap_or("null"),
                            peripheral.identity,
                            peripheral.signal_strength
                        );
                    }
                    self.notify(SessionUpdate::Discovered(peripheral));
                }
                Ok(None) => {}
                Err(e) => log::warn!("Discarding discovery event: {}", e),
            },
            DiscoveryEvent::Failed { episode, .. } if episode != inner.episode => {
                log::debug!("Ignoring radio failure reported for earlier episode {}", episode);
            }
            DiscoveryEvent::Failed { reason, .. } => {
                log::error!("Radio reported scan failure: {}", reason);
                self.notify(SessionUpdate::Error(format!("Scan failed: {}", reason)));
                let _ = self.end_episode(&mut inner);
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let mut inner = self.lock();
        if inner.pending_start.take().is_some() {
            log::debug!("Dropping session with a pending start");
        }
        if inner.state == SessionState::Scanning {
            log::info!("Session disposed while scanning, stopping radio");
            let _ = self.end_episode(&mut inner);
        }
    }
}
