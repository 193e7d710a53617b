//! # DShot Waveform Builder
//!
//! Expands a 16-bit DShot frame into the timed pulse sequence that puts it
//! on the wire.
//!
//! Every bit occupies exactly one `T_PERIOD`: a high pulse (long for '1',
//! short for '0') followed by a low pulse filling the remainder. One
//! trailing low period separates consecutive frames.

use super::protocol::*;

/// Build the pulse sequence for one DShot frame on one GPIO line
///
/// # Arguments
///
/// * `frame` - Complete 16-bit DShot frame, transmitted MSB-first
/// * `timing` - Bit timings for the selected speed class
/// * `line` - GPIO line number the pulses target
///
/// # Returns
///
/// * `Vec<Pulse>` - 33 pulses: 16 high/low pairs plus the inter-frame gap.
///   Pure function of its inputs; performs no I/O.
pub fn build_waveform(frame: u16, timing: TimingProfile, line: u8) -> Vec<Pulse> {
    let mut pulses = Vec::with_capacity(DSHOT_PULSES_PER_FRAME);

    for i in 0..DSHOT_FRAME_BITS {
        // Most significant bit first
        let is_one = (frame >> (DSHOT_FRAME_BITS - 1 - i)) & 1 == 1;
        let high_us = if is_one { timing.t1h_us } else { timing.t0h_us };

        pulses.push(Pulse::high(line, high_us));
        pulses.push(Pulse::low(line, timing.period_us - high_us));
    }

    // Hold the line low between frames so the ESC sees the boundary
    pulses.push(Pulse::low(line, DSHOT_INTER_FRAME_GAP_US));

    pulses
}
