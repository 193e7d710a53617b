//! # Error Types
//!
//! Custom error types for ESC Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for ESC Bridge
#[derive(Debug, Error)]
pub enum EscBridgeError {
    /// Requested DShot rate is not in the timing table
    #[error("unsupported DShot rate: {0} (supported: 150, 300, 600)")]
    UnsupportedRate(u16),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Waveform submission or completion failed on a GPIO line
    #[error("transmission failed on GPIO {line}: {reason}")]
    Transmission { line: u8, reason: String },

    /// GPIO line ownership violations (already claimed, used after release)
    #[error("GPIO resource error: {0}")]
    Resource(String),

    /// Errors from the Raspberry Pi GPIO layer
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ESC Bridge
pub type Result<T> = std::result::Result<T, EscBridgeError>;
