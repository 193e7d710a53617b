//! Trait abstraction for GPIO waveform output to enable testing

use crate::dshot::Pulse;
use crate::error::Result;

/// Identifies one submitted waveform for busy polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHandle(pub u32);

/// Trait for GPIO line ownership and waveform transmission
///
/// One implementation binds to the platform GPIO layer; the `mocks` module
/// provides a recording implementation for driver tests.
pub trait GpioWaveformIO: Send {
    /// Claim exclusive output ownership of a line, driven low
    fn claim_output(&mut self, line: u8) -> Result<()>;

    /// Return a claimed line to a safe state and give up ownership
    fn release(&mut self, line: u8) -> Result<()>;

    /// Set the level of a claimed line
    fn write(&mut self, line: u8, high: bool) -> Result<()>;

    /// Queue a pulse sequence for transmission on a claimed line
    fn submit_waveform(&mut self, line: u8, pulses: &[Pulse]) -> Result<TxHandle>;

    /// Whether the transmission behind `handle` is still in flight
    fn is_busy(&mut self, handle: TxHandle) -> Result<bool>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::EscBridgeError;
    use std::sync::{Arc, Mutex};

    /// Mock GPIO layer for testing
    #[derive(Clone)]
    pub struct MockGpio {
        pub claimed: Arc<Mutex<Vec<u8>>>,
        pub released: Arc<Mutex<Vec<u8>>>,
        pub writes: Arc<Mutex<Vec<(u8, bool)>>>,
        pub submitted: Arc<Mutex<Vec<(u8, Vec<Pulse>)>>>,
        pub claim_error: Arc<Mutex<Option<String>>>,
        pub submit_error: Arc<Mutex<Option<String>>>,
        /// How many is_busy polls report "busy" before the line goes idle
        pub busy_polls: Arc<Mutex<u32>>,
        pub busy_polls_seen: Arc<Mutex<u32>>,
        next_handle: Arc<Mutex<u32>>,
    }

    impl MockGpio {
        pub fn new() -> Self {
            Self {
                claimed: Arc::new(Mutex::new(Vec::new())),
                released: Arc::new(Mutex::new(Vec::new())),
                writes: Arc::new(Mutex::new(Vec::new())),
                submitted: Arc::new(Mutex::new(Vec::new())),
                claim_error: Arc::new(Mutex::new(None)),
                submit_error: Arc::new(Mutex::new(None)),
                busy_polls: Arc::new(Mutex::new(0)),
                busy_polls_seen: Arc::new(Mutex::new(0)),
                next_handle: Arc::new(Mutex::new(0)),
            }
        }

        pub fn submitted_waveforms(&self) -> Vec<(u8, Vec<Pulse>)> {
            self.submitted.lock().unwrap().clone()
        }

        pub fn claimed_lines(&self) -> Vec<u8> {
            self.claimed.lock().unwrap().clone()
        }

        pub fn released_lines(&self) -> Vec<u8> {
            self.released.lock().unwrap().clone()
        }

        pub fn set_claim_error(&self, reason: &str) {
            *self.claim_error.lock().unwrap() = Some(reason.to_string());
        }

        pub fn set_submit_error(&self, reason: &str) {
            *self.submit_error.lock().unwrap() = Some(reason.to_string());
        }

        pub fn set_busy_polls(&self, polls: u32) {
            *self.busy_polls.lock().unwrap() = polls;
        }
    }

    impl GpioWaveformIO for MockGpio {
        fn claim_output(&mut self, line: u8) -> Result<()> {
            if let Some(reason) = self.claim_error.lock().unwrap().clone() {
                return Err(EscBridgeError::Resource(reason));
            }
            self.claimed.lock().unwrap().push(line);
            Ok(())
        }

        fn release(&mut self, line: u8) -> Result<()> {
            self.released.lock().unwrap().push(line);
            Ok(())
        }

        fn write(&mut self, line: u8, high: bool) -> Result<()> {
            self.writes.lock().unwrap().push((line, high));
            Ok(())
        }

        fn submit_waveform(&mut self, line: u8, pulses: &[Pulse]) -> Result<TxHandle> {
            if let Some(reason) = self.submit_error.lock().unwrap().clone() {
                return Err(EscBridgeError::Transmission {
                    line,
                    reason,
                });
            }
            self.submitted.lock().unwrap().push((line, pulses.to_vec()));
            let mut next = self.next_handle.lock().unwrap();
            *next += 1;
            Ok(TxHandle(*next))
        }

        fn is_busy(&mut self, _handle: TxHandle) -> Result<bool> {
            let mut remaining = self.busy_polls.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                *self.busy_polls_seen.lock().unwrap() += 1;
                return Ok(true);
            }
            Ok(false)
        }
    }
}
