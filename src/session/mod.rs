//! # Session Module
//!
//! Interactive throttle control session wrapped around one motor driver.
//!
//! This module handles:
//! - The propeller-removal safety confirmation
//! - Parsing throttle / ramp / exit commands from stdin
//! - Re-sending the last throttle at a fixed refresh interval so the ESC
//!   keeps seeing a live signal between user inputs
//! - Ctrl-C and EOF handling
//! - Closing the motor exactly once on every exit path

use crate::config::{Config, SessionConfig};
use crate::error::Result;
use crate::gpio::GpioWaveformIO;
use crate::motor::DshotMotor;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, sleep};
use tracing::{debug, info};

/// One parsed line of user input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Set throttle to a value in [0.0, 1.0]
    Throttle(f64),

    /// Step gradually from the current throttle to the target
    Ramp(f64),

    /// End the session
    Exit,
}

/// Parse a line of user input into a command
///
/// Accepts a bare number (`0.15`), `ramp <target>`, or an exit keyword
/// (`exit`, `quit`, `q`). Numeric values outside [0.0, 1.0] are rejected
/// with a message suitable for re-prompting; clamping happens only at the
/// driver boundary, user typos deserve a complaint instead.
pub fn parse_command(input: &str) -> std::result::Result<Command, String> {
    let input = input.trim().to_lowercase();

    if matches!(input.as_str(), "exit" | "quit" | "q") {
        return Ok(Command::Exit);
    }

    if let Some(target) = input.strip_prefix("ramp") {
        let target: f64 = target
            .trim()
            .parse()
            .map_err(|_| "usage: ramp <target between 0.0 and 1.0>".to_string())?;
        if !(0.0..=1.0).contains(&target) {
            return Err("ramp target must be between 0.0 and 1.0".to_string());
        }
        return Ok(Command::Ramp(target));
    }

    let value: f64 = input
        .parse()
        .map_err(|_| "enter a number (e.g. 0.05), 'ramp <target>' or 'exit'".to_string())?;
    if !(0.0..=1.0).contains(&value) {
        return Err("throttle must be between 0.0 and 1.0".to_string());
    }
    Ok(Command::Throttle(value))
}

/// Ask for the propeller-removal confirmation on stdin
///
/// Anything other than an explicit `yes`/`y` counts as a refusal.
pub async fn confirm_propellers_removed() -> Result<bool> {
    println!("!!! WARNING !!! Are the propellers REMOVED? (yes/no): ");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "yes" | "y"))
}

/// Block until the user presses Enter
pub async fn wait_for_enter(prompt: &str) -> Result<()> {
    println!("{}", prompt);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines.next_line().await?;
    Ok(())
}

/// Interactive throttle session owning one motor driver
pub struct Session<IO: GpioWaveformIO> {
    motor: DshotMotor<IO>,
    settings: SessionConfig,
    telemetry: bool,
    last_throttle: f64,
}

impl<IO: GpioWaveformIO> Session<IO> {
    pub fn new(motor: DshotMotor<IO>, config: &Config) -> Self {
        Self {
            motor,
            settings: config.session.clone(),
            telemetry: config.dshot.telemetry,
            last_throttle: 0.0,
        }
    }

    /// Run the interactive loop, then stop the motor
    ///
    /// Every exit path (exit keyword, EOF, Ctrl-C, transmission error)
    /// funnels through the single `close()` below. The session owns the
    /// motor, so a second close is unrepresentable.
    pub async fn run(mut self) -> Result<()> {
        println!("Enter throttle between 0.0 and 1.0 (e.g. 0.1 for 10%).");
        println!("Commands: 'ramp <target>', 'exit' (or Ctrl-C) to stop.");

        let outcome = self.drive_loop().await;

        // Single shutdown path: zero-throttle burst, line driven low, released
        let closed = self.motor.close().await;
        outcome.and(closed)
    }

    async fn drive_loop(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut refresh = interval(Duration::from_millis(self.settings.refresh_interval_ms));
        let mut refresh_count: u64 = 0;
        let mut last_log: u64 = 0;

        loop {
            tokio::select! {
                // Keep the ESC fed with the last commanded throttle
                _ = refresh.tick() => {
                    self.motor.send_throttle(self.last_throttle, self.telemetry).await?;
                    refresh_count += 1;

                    if refresh_count - last_log >= self.settings.status_log_every {
                        debug!(
                            "Refreshed throttle {:.2} ({} frames sent)",
                            self.last_throttle, refresh_count
                        );
                        last_log = refresh_count;
                    }
                }

                line = lines.next_line() => {
                    let Some(text) = line? else {
                        info!("Input closed, shutting down");
                        return Ok(());
                    };
                    if text.trim().is_empty() {
                        continue;
                    }

                    match parse_command(&text) {
                        Ok(Command::Exit) => {
                            info!("Exit requested");
                            return Ok(());
                        }
                        Ok(Command::Throttle(value)) => {
                            self.apply_throttle(value).await?;
                        }
                        Ok(Command::Ramp(target)) => {
                            self.ramp_to(target).await?;
                        }
                        Err(message) => {
                            println!("Error: {}", message);
                        }
                    }
                }

                // Interrupts still route through the close path in run()
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    return Ok(());
                }
            }
        }
    }

    async fn apply_throttle(&mut self, value: f64) -> Result<()> {
        let frame = self.motor.send_throttle(value, self.telemetry).await?;
        self.last_throttle = value;
        println!("  Throttle {:.2} -> DShot frame {} ({:#018b})", value, frame, frame);
        Ok(())
    }

    /// Step from the current throttle to `target` one increment at a time
    async fn ramp_to(&mut self, target: f64) -> Result<()> {
        let step = self.settings.ramp_step;
        info!("Ramping from {:.2} to {:.2}", self.last_throttle, target);

        while (self.last_throttle - target).abs() > step {
            let next = if self.last_throttle < target {
                self.last_throttle + step
            } else {
                self.last_throttle - step
            };
            self.motor.send_throttle(next, self.telemetry).await?;
            self.last_throttle = next;
            sleep(Duration::from_millis(self.settings.refresh_interval_ms)).await;
        }

        let frame = self.motor.send_throttle(target, self.telemetry).await?;
        self.last_throttle = target;
        println!("  Throttle {:.2} -> DShot frame {} ({:#018b})", target, frame, frame);
        Ok(())
    }
}
