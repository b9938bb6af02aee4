use crate::error::ScanError;
use crate::peripheral::Peripheral;
use crate::session::{ScanSessionManager, SessionState, SessionUpdate, StartOutcome};
use crate::ui::styles;
use crossbeam_channel::Receiver;
use iced::widget::{button, column, container, scrollable, text};
use iced::{Element, Length, Subscription, Task};

// Iced Application State
pub struct BleScanner {
    manager: ScanSessionManager,
    updates: Receiver<SessionUpdate>,
    devices: Vec<Peripheral>,
    is_scanning: bool,
    start_pending: bool,
    status: Option<String>,
    unknown_device_label: String,
}

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    StartScanning,
    StartFinished(Result<StartOutcome, ScanError>),
    StopScanning,
}

impl BleScanner {
    pub fn new(
        manager: ScanSessionManager,
        updates: Receiver<SessionUpdate>,
        unknown_device_label: String,
    ) -> (Self, Task<Message>) {
        let devices = manager.current_results();
        let is_scanning = manager.is_scanning();
        (
            BleScanner {
                manager,
                updates,
                devices,
                is_scanning,
                start_pending: false,
                status: None,
                unknown_device_label,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                // Process all pending updates without blocking
                for update in self.updates.try_iter() {
                    match update {
                        SessionUpdate::StateChanged(SessionState::Scanning) => {
                            // A new episode starts from an empty list
                            self.devices.clear();
                            self.is_scanning = true;
                        }
                        SessionUpdate::StateChanged(SessionState::Idle) => {
                            self.is_scanning = false;
                        }
                        SessionUpdate::Discovered(device) => {
                            self.devices.push(device);
                        }
                        SessionUpdate::Warning(msg) | SessionUpdate::Error(msg) => {
                            self.status = Some(msg);
                        }
                    }
                }
                Task::none()
            }
            Message::StartScanning => {
                self.status = None;
                self.start_pending = true;
                let manager = self.manager.clone();
                Task::perform(async move { manager.start().await }, Message::StartFinished)
            }
            Message::StartFinished(result) => {
                match result {
                    // A cancelled start says nothing about a newer one still pending
                    Ok(StartOutcome::Superseded) => {}
                    Ok(_) => self.start_pending = false,
                    Err(e) => {
                        self.start_pending = false;
                        self.status = Some(e.to_string());
                    }
                }
                Task::none()
            }
            Message::StopScanning => {
                self.start_pending = false;
                if let Err(e) = self.manager.stop() {
                    self.status = Some(e.to_string());
                }
                Task::none()
            }
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    pub fn view(&'_ self) -> Element<'_, Message> {
        // A pending start can be cancelled with the same button
        let active = self.is_scanning || self.start_pending;

        let toggle = button(text(if active { "Stop Scanning" } else { "Start Scanning" }))
            .on_press(if active {
                Message::StopScanning
            } else {
                Message::StartScanning
            })
            .padding(10)
            .width(Length::Fill)
            .style(styles::toggle_button_style(active));

        let mut content = column![toggle].spacing(10);

        if let Some(status) = &self.status {
            content = content.push(text(status.as_str()).size(14).color(styles::WARNING_TEXT));
        }

        content = content.push(self.device_list());

        container(content.padding(20))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn device_list(&self) -> Element<'_, Message> {
        if self.devices.is_empty() {
            let message = if self.is_scanning {
                "Scanning for devices..."
            } else {
                "No devices found. Start scanning!"
            };
            return container(text(message).size(16).color(styles::MUTED_TEXT))
                .width(Length::Fill)
                .center_x(Length::Fill)
                .padding(20)
                .into();
        }

        let rows = self.devices.iter().map(|device| {
            let label = device.display_label(&self.unknown_device_label);
            container(
                column![
                    text(label).size(16),
                    text(format!("RSSI: {} dBm", device.signal_strength))
                        .size(14)
                        .color(styles::MUTED_TEXT),
                ]
                .spacing(2),
            )
            .style(container::bordered_box)
            .width(Length::Fill)
            .padding(10)
            .into()
        });

        scrollable(column(rows).spacing(5)).height(Length::Fill).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{Capability, PlatformGate};
    use crate::radio::UnavailableRadio;
    use crossbeam_channel::Sender;
    use std::sync::Arc;

    fn scanner() -> (BleScanner, Sender<SessionUpdate>) {
        let manager = ScanSessionManager::new(
            Arc::new(UnavailableRadio::new("test")),
            Arc::new(PlatformGate),
            Capability::all(),
        );
        let (tx, rx) = crossbeam_channel::unbounded();
        let (app, _task) = BleScanner::new(manager, rx, "Unknown Device".to_string());
        (app, tx)
    }

    fn device(id: &str) -> Peripheral {
        Peripheral {
            identity: id.to_string(),
            display_name: None,
            signal_strength: -50,
        }
    }

    #[test]
    fn test_tick_applies_updates_in_order() {
        let (mut app, tx) = scanner();
        app.devices.push(device("OLD"));

        tx.send(SessionUpdate::StateChanged(SessionState::Scanning)).unwrap();
        tx.send(SessionUpdate::Discovered(device("A"))).unwrap();
        tx.send(SessionUpdate::Discovered(device("B"))).unwrap();
        let _ = app.update(Message::Tick);

        assert!(app.is_scanning);
        assert_eq!(app.devices, vec![device("A"), device("B")]);

        tx.send(SessionUpdate::StateChanged(SessionState::Idle)).unwrap();
        tx.send(SessionUpdate::Error("Scan failed: adapter gone".to_string())).unwrap();
        let _ = app.update(Message::Tick);

        assert!(!app.is_scanning);
        // Results stay on screen after the scan ends
        assert_eq!(app.devices.len(), 2);
        assert_eq!(app.status.as_deref(), Some("Scan failed: adapter gone"));
    }

    #[test]
    fn test_superseded_start_keeps_newer_start_pending() {
        let (mut app, _tx) = scanner();

        let _ = app.update(Message::StartScanning);
        assert!(app.start_pending);
        let _ = app.update(Message::StopScanning);
        assert!(!app.start_pending);
        let _ = app.update(Message::StartScanning);

        // The cancelled start reports back while the second is still waiting
        let _ = app.update(Message::StartFinished(Ok(StartOutcome::Superseded)));
        assert!(app.start_pending);

        let _ = app.update(Message::StartFinished(Err(ScanError::PermissionDenied)));
        assert!(!app.start_pending);
        assert!(app.status.is_some());
    }
}
