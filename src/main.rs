// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod config;
mod device_scanner;
mod error;
mod peripheral;
mod permission;
mod radio;
mod session;
mod ui;

use app::BleScanner;
use config::Config;
use device_scanner::BtleplugRadio;
use iced::Theme;
use permission::PlatformGate;
use radio::{RadioScanSource, UnavailableRadio};
use session::ScanSessionManager;
use std::sync::Arc;

fn main() -> iced::Result {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}, using defaults", e);
            Config::default()
        }
    };

    // Without an adapter the window still opens; starting a scan reports the reason
    let btleplug = match BtleplugRadio::new(config.adapter_index) {
        Ok(radio) => Some(Arc::new(radio)),
        Err(e) => {
            log::error!("{}", e);
            None
        }
    };
    let radio: Arc<dyn RadioScanSource> = match &btleplug {
        Some(radio) => radio.clone(),
        None => Arc::new(UnavailableRadio::new("no Bluetooth adapter could be opened")),
    };

    let (update_sender, update_receiver) = crossbeam_channel::unbounded();
    let manager = ScanSessionManager::with_updates(
        radio,
        Arc::new(PlatformGate),
        config.required_capabilities.clone(),
        update_sender,
        config.log_discoveries,
    );

    let unknown_device_label = config.unknown_device_label.clone();
    let result = iced::application("BLE Scanner", BleScanner::update, BleScanner::view)
        .subscription(BleScanner::subscription)
        .theme(|_| Theme::Light)
        .window_size((480.0, 720.0))
        .run_with(move || BleScanner::new(manager, update_receiver, unknown_device_label));

    if let Some(radio) = btleplug {
        radio.shutdown();
    }

    result
}
