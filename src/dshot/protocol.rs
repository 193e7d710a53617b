//! # DShot Protocol Constants and Types
//!
//! Core protocol definitions for DShot ESC communication.

use crate::error::{EscBridgeError, Result};

/// Number of bits in a DShot frame
pub const DSHOT_FRAME_BITS: usize = 16;

/// Lowest 11-bit value used for throttle; 1-47 are reserved ESC commands
pub const DSHOT_THROTTLE_MIN: u16 = 48;

/// Highest 11-bit throttle value
pub const DSHOT_THROTTLE_MAX: u16 = 2047;

/// Reserved 11-bit value meaning "disarmed / no throttle"
pub const DSHOT_CMD_DISARM: u16 = 0;

/// Pulses per frame: two per bit plus one trailing inter-frame gap
pub const DSHOT_PULSES_PER_FRAME: usize = DSHOT_FRAME_BITS * 2 + 1;

/// Low period appended after the last bit so the ESC detects the frame
/// boundary (µs)
pub const DSHOT_INTER_FRAME_GAP_US: u16 = 50;

/// DShot speed classes supported by the timing table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DshotRate {
    Dshot150,
    Dshot300,
    Dshot600,
}

impl DshotRate {
    /// Look up a speed class from its numeric rate key (e.g. 300)
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedRate` for any key not in the table. Callers must
    /// reject the rate before claiming hardware resources.
    pub fn from_key(key: u16) -> Result<Self> {
        match key {
            150 => Ok(Self::Dshot150),
            300 => Ok(Self::Dshot300),
            600 => Ok(Self::Dshot600),
            other => Err(EscBridgeError::UnsupportedRate(other)),
        }
    }

    /// Numeric rate key (kbit/s) for display
    pub fn key(&self) -> u16 {
        match self {
            Self::Dshot150 => 150,
            Self::Dshot300 => 300,
            Self::Dshot600 => 600,
        }
    }

    /// Bit timings for this speed class.
    ///
    /// Durations are whole microseconds since the waveform layer works in
    /// integer µs. DShot300 timings are exact; DShot600 is approximated with
    /// the same 3 µs bit period (effectively DShot300/333 on the wire), which
    /// BLHeli-family ESCs tolerate. DShot150 is the most relaxed class.
    pub fn timing(&self) -> TimingProfile {
        match self {
            Self::Dshot150 => TimingProfile { t0h_us: 2, t1h_us: 4, period_us: 6 },
            Self::Dshot300 => TimingProfile { t0h_us: 1, t1h_us: 2, period_us: 3 },
            Self::Dshot600 => TimingProfile { t0h_us: 1, t1h_us: 2, period_us: 3 },
        }
    }
}

impl std::fmt::Display for DshotRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DShot{}", self.key())
    }
}

/// Bit timings for one DShot speed class, in microseconds
///
/// Invariant: `t0h_us < t1h_us < period_us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    /// High time of a '0' bit
    pub t0h_us: u16,

    /// High time of a '1' bit
    pub t1h_us: u16,

    /// Total duration of one bit
    pub period_us: u16,
}

/// One timed level change on a GPIO bank
///
/// Mirrors the set-mask/clear-mask/delay triple consumed by waveform-capable
/// GPIO layers: drive high every line in `set_mask`, drive low every line in
/// `clear_mask`, then hold for `delay_us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// Bitmask of lines to drive high
    pub set_mask: u32,

    /// Bitmask of lines to drive low
    pub clear_mask: u32,

    /// Hold time after the level change (µs)
    pub delay_us: u16,
}

impl Pulse {
    /// A pulse driving `line` high for `delay_us`
    pub fn high(line: u8, delay_us: u16) -> Self {
        Self { set_mask: 1 << line, clear_mask: 0, delay_us }
    }

    /// A pulse driving `line` low for `delay_us`
    pub fn low(line: u8, delay_us: u16) -> Self {
        Self { set_mask: 0, clear_mask: 1 << line, delay_us }
    }
}
