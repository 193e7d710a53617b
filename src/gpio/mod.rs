//! # GPIO Module
//!
//! Raspberry Pi GPIO binding for DShot waveform output.
//!
//! This module handles:
//! - Claiming and releasing GPIO lines as outputs
//! - Software-timed transmission of pulse sequences
//! - The [`GpioWaveformIO`] capability consumed by the motor driver

use crate::dshot::Pulse;
use crate::error::{EscBridgeError, Result};
use rppal::gpio::{Gpio, OutputPin};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

pub mod output_trait;

pub use output_trait::{GpioWaveformIO, TxHandle};

/// Raspberry Pi GPIO layer
///
/// Bit-bangs waveforms in software. Pulse delays use spin-based sleeping for
/// microsecond precision; an OS `thread::sleep` has millisecond granularity
/// and would stretch every DShot bit beyond recognition.
///
/// Transmission completes synchronously inside [`submit_waveform`], so
/// [`is_busy`] reports idle immediately. The busy-poll contract exists for
/// backends that offload waveforms (DMA, daemon-side wave queues).
///
/// [`submit_waveform`]: GpioWaveformIO::submit_waveform
/// [`is_busy`]: GpioWaveformIO::is_busy
pub struct RppalGpio {
    gpio: Gpio,
    pins: HashMap<u8, OutputPin>,
    next_handle: u32,
}

impl std::fmt::Debug for RppalGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RppalGpio")
            .field("claimed_lines", &self.pins.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RppalGpio {
    /// Open the GPIO peripheral
    ///
    /// # Errors
    ///
    /// Returns error if the GPIO character device cannot be opened (not a
    /// Raspberry Pi, or missing permissions on `/dev/gpiochip0`).
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new()?;
        info!("GPIO peripheral opened");
        Ok(Self {
            gpio,
            pins: HashMap::new(),
            next_handle: 0,
        })
    }
}

impl GpioWaveformIO for RppalGpio {
    fn claim_output(&mut self, line: u8) -> Result<()> {
        if self.pins.contains_key(&line) {
            return Err(EscBridgeError::Resource(format!(
                "GPIO {} is already claimed",
                line
            )));
        }

        let pin = self.gpio.get(line)?.into_output_low();
        self.pins.insert(line, pin);
        info!("Claimed GPIO {} as output (low)", line);
        Ok(())
    }

    fn release(&mut self, line: u8) -> Result<()> {
        let mut pin = self.pins.remove(&line).ok_or_else(|| {
            EscBridgeError::Resource(format!("GPIO {} is not claimed", line))
        })?;

        // Leave the line low; dropping the pin restores its previous mode
        pin.set_low();
        info!("Released GPIO {}", line);
        Ok(())
    }

    fn write(&mut self, line: u8, high: bool) -> Result<()> {
        let pin = self.pins.get_mut(&line).ok_or_else(|| {
            EscBridgeError::Resource(format!("GPIO {} is not claimed", line))
        })?;

        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }

    fn submit_waveform(&mut self, line: u8, pulses: &[Pulse]) -> Result<TxHandle> {
        let pin = self.pins.get_mut(&line).ok_or_else(|| {
            EscBridgeError::Resource(format!("GPIO {} is not claimed", line))
        })?;

        let mask = 1u32 << line;
        for pulse in pulses {
            if pulse.set_mask & mask != 0 {
                pin.set_high();
            }
            if pulse.clear_mask & mask != 0 {
                pin.set_low();
            }
            spin_sleep::sleep(Duration::from_micros(u64::from(pulse.delay_us)));
        }

        self.next_handle = self.next_handle.wrapping_add(1);
        debug!("Transmitted {} pulses on GPIO {}", pulses.len(), line);
        Ok(TxHandle(self.next_handle))
    }

    fn is_busy(&mut self, _handle: TxHandle) -> Result<bool> {
        // Software transmission finished before submit_waveform returned
        Ok(false)
    }
}
