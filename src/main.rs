//! # ESC Bridge
//!
//! Drive a brushless ESC from a single-board computer's GPIO via DShot.
//!
//! This application claims one GPIO line, arms the connected ESC, then runs
//! an interactive throttle session until the user exits.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Load configuration (path from the first CLI argument, else
//!      `config/default.toml`, else built-in defaults)
//!    - Safety confirmation: propellers must be removed
//!
//! 2. **Arming**
//!    - Claim the GPIO line for DShot output
//!    - Wait for the user's go-ahead, then send zero throttle for the
//!      arming window (~2 s at ~100 Hz)
//!
//! 3. **Session**
//!    - Interactive throttle input with periodic refresh frames
//!    - Ctrl+C, `exit` or EOF end the session
//!
//! 4. **Shutdown**
//!    - Zero-throttle burst, line driven low and released
//!
//! # Errors
//!
//! Exits nonzero if the GPIO layer cannot be opened, the configuration is
//! invalid, or an unrecovered transmission error ends the session.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use esc_bridge::config::Config;
use esc_bridge::gpio::RppalGpio;
use esc_bridge::motor::DshotMotor;
use esc_bridge::session::{confirm_propellers_removed, wait_for_enter, Session};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("ESC Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&config_path).exists() {
        info!("Loading configuration from {}", config_path);
        Config::load(&config_path)?
    } else {
        info!("No configuration file at {}, using defaults", config_path);
        Config::default()
    };

    info!(
        "GPIO {} selected for DShot{} output",
        config.gpio.line, config.dshot.rate
    );

    if config.safety.require_confirmation && !confirm_propellers_removed().await? {
        info!("Safety first! Exiting without touching the hardware.");
        return Ok(());
    }

    let gpio = RppalGpio::new()?;
    let mut motor =
        DshotMotor::with_pacing(gpio, config.gpio.line, config.dshot.rate, config.pacing())?;

    // The line is claimed from here on; every path below must end in close()
    if let Err(e) = wait_for_enter(
        "Power the ESC and listen for its startup tones, then press Enter to arm...",
    )
    .await
    {
        motor.close().await?;
        return Err(e.into());
    }

    motor.arm().await;

    Session::new(motor, &config).run().await?;

    info!("Session finished cleanly");
    Ok(())
}
