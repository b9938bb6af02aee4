//! # Error Types Module
//!
//! Centralized error handling for the scanner.
//! None of these are fatal: the session manager recovers locally and
//! reports them upward for display.
//!
//! ## Error Types
//! - `ScanError`: scan session failures (permission, radio start/stop, bad events)
//! - `RadioError`: what a radio source reports when a command cannot be applied
//! - `ConfigError`: configuration file I/O and parsing errors

use std::fmt;

/// Errors reported by a radio scan source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// No usable radio behind this source
    NotAvailable(String),
    /// The radio refused or could not queue the command
    CommandRejected(String),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::NotAvailable(reason) => {
                write!(f, "Bluetooth radio not available: {}", reason)
            }
            RadioError::CommandRejected(reason) => {
                write!(f, "Bluetooth radio rejected command: {}", reason)
            }
        }
    }
}

impl std::error::Error for RadioError {}

/// Errors that can occur during a scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Required capabilities were not granted
    PermissionDenied,
    /// The radio failed to start scanning
    RadioStartFailure(RadioError),
    /// The radio failed to stop scanning
    RadioStopFailure(RadioError),
    /// A discovery event could not be turned into a peripheral
    MalformedEvent(String),
    /// Bluetooth manager initialization failed
    ManagerInit(String),
    /// No Bluetooth adapters available
    NoAdapters,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::PermissionDenied => {
                write!(f, "Required permissions not granted.")
            }
            ScanError::RadioStartFailure(e) => {
                write!(f, "Error starting scan: {}", e)
            }
            ScanError::RadioStopFailure(e) => {
                write!(f, "Error stopping scan: {}", e)
            }
            ScanError::MalformedEvent(msg) => {
                write!(f, "Malformed discovery event: {}", msg)
            }
            ScanError::ManagerInit(msg) => {
                write!(f, "Failed to initialize Bluetooth manager: {}", msg)
            }
            ScanError::NoAdapters => {
                write!(f, "No Bluetooth adapters found. Please ensure Bluetooth is enabled.")
            }
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::RadioStartFailure(e) => Some(e),
            ScanError::RadioStopFailure(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::WriteFailed(e) => write!(f, "Failed to write config file: {}", e),
            ConfigError::ParseFailed(e) => write!(f, "Failed to parse config file: {}", e),
            ConfigError::SerializeFailed(e) => write!(f, "Failed to serialize config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_no_adapters_display() {
        let err = ScanError::NoAdapters;
        assert!(err.to_string().contains("Bluetooth"));
    }

    #[test]
    fn test_radio_failure_chain() {
        let err = ScanError::RadioStartFailure(RadioError::NotAvailable("no adapter".into()));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("no adapter"));
        assert!(ScanError::PermissionDenied.source().is_none());
    }

    #[test]
    fn test_config_error_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::ReadFailed(io_err);
        assert!(err.source().is_some());
    }
}
