//! # Bluetooth Device Scanner
//!
//! btleplug-backed `RadioScanSource`. The adapter lives on a dedicated
//! thread with its own Tokio runtime; `start`/`stop` only queue commands
//! for it, so they return immediately and are applied in call order.

use crate::error::{RadioError, ScanError};
use crate::radio::{
    DiscoveryEmitter, DiscoveryEvent, DiscoveryHandler, RadioScanSource, RawAdvertisement,
    SubscriptionToken,
};
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;
use std::sync::{mpsc as std_mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RadioCommand {
    /// Start scanning on behalf of a session episode
    Start(u64),
    Stop,
    Shutdown,
}

pub struct BtleplugRadio {
    commands: mpsc::UnboundedSender<RadioCommand>,
    emitter: Arc<DiscoveryEmitter>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BtleplugRadio {
    /// Spawns the radio thread and waits until it has acquired adapter `adapter_index`.
    pub fn new(adapter_index: usize) -> Result<Self, ScanError> {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), ScanError>>();
        let emitter = Arc::new(DiscoveryEmitter::new());
        let worker_emitter = emitter.clone();

        let worker = std::thread::spawn(move || {
            let rt = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(ScanError::ManagerInit(e.to_string())));
                    return;
                }
            };

            rt.block_on(async move {
                let central = match acquire_adapter(adapter_index).await {
                    Ok(central) => central,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                radio_loop(central, command_rx, worker_emitter).await;
            });
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                emitter,
                worker: Mutex::new(Some(worker)),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ScanError::ManagerInit("radio thread exited".to_string())),
        }
    }

    /// Stops any running scan and waits for the radio thread to exit.
    pub fn shutdown(&self) {
        let _ = self.commands.send(RadioCommand::Shutdown);
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = worker {
            if handle.join().is_err() {
                log::error!("Radio thread panicked");
            }
        }
    }

    fn send(&self, command: RadioCommand) -> Result<(), RadioError> {
        self.commands
            .send(command)
            .map_err(|_| RadioError::NotAvailable("radio thread is not running".to_string()))
    }
}

impl RadioScanSource for BtleplugRadio {
    fn subscribe(&self, handler: DiscoveryHandler) -> SubscriptionToken {
        self.emitter.add_listener(handler)
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.emitter.remove_listener(token);
    }

    fn start(&self, episode: u64) -> Result<(), RadioError> {
        self.send(RadioCommand::Start(episode))
    }

    fn stop(&self) -> Result<(), RadioError> {
        self.send(RadioCommand::Stop)
    }
}

async fn acquire_adapter(adapter_index: usize) -> Result<Adapter, ScanError> {
    let manager = Manager::new()
        .await
        .map_err(|e| ScanError::ManagerInit(e.to_string()))?;

    let adapters = manager
        .adapters()
        .await
        .map_err(|e| ScanError::ManagerInit(format!("Failed to get adapters: {}", e)))?;

    let central = adapters
        .into_iter()
        .nth(adapter_index)
        .ok_or(ScanError::NoAdapters)?;

    log::info!("Using Bluetooth adapter {}", adapter_index);
    Ok(central)
}

async fn radio_loop(
    central: Adapter,
    mut commands: mpsc::UnboundedReceiver<RadioCommand>,
    emitter: Arc<DiscoveryEmitter>,
) {
    let mut events = match central.events().await {
        Ok(events) => events,
        Err(e) => {
            log::error!("Failed to subscribe to adapter events: {}", e);
            return;
        }
    };

    let mut scanning = false;

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(RadioCommand::Start(episode)) => {
                        match central.start_scan(ScanFilter::default()).await {
                            Ok(()) => {
                                log::debug!("Radio: scan started");
                                scanning = true;
                            }
                            Err(e) => {
                                log::error!("Radio: failed to start scan: {}", e);
                                emitter.emit(DiscoveryEvent::Failed {
                                    episode,
                                    reason: e.to_string(),
                                });
                            }
                        }
                    }
                    Some(RadioCommand::Stop) => {
                        scanning = false;
                        if let Err(e) = central.stop_scan().await {
                            log::error!("Radio: failed to stop scan: {}", e);
                        }
                    }
                    Some(RadioCommand::Shutdown) | None => {
                        if scanning {
                            if let Err(e) = central.stop_scan().await {
                                log::error!("Radio: failed to stop scan on shutdown: {}", e);
                            }
                        }
                        break;
                    }
                }
            }
            Some(event) = events.next() => {
                if scanning {
                    if let CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) = event {
                        if let Some(advertisement) = read_advertisement(&central, &id).await {
                            emitter.emit(DiscoveryEvent::Advertisement(advertisement));
                        }
                    }
                }
            }
        }
    }

    log::info!("Radio: command channel closed, shutting down");
}

/// Reads the properties btleplug has cached for a peripheral.
///
/// Returns `None` until an RSSI has been observed.
async fn read_advertisement(central: &Adapter, id: &PeripheralId) -> Option<RawAdvertisement> {
    let peripheral = central.peripheral(id).await.ok()?;
    let props = peripheral.properties().await.ok()??;
    let rssi = props.rssi?;

    Some(RawAdvertisement {
        identity: props.address.to_string(),
        name: props.local_name,
        rssi,
    })
}
