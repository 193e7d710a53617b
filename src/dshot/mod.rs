//! # DShot Module
//!
//! DShot protocol encoding: throttle → frame → timed pulse waveform.
//!
//! This module handles:
//! - Packing throttle + telemetry flag into checksummed 16-bit frames
//! - Expanding frames into set/clear/delay pulse sequences per speed class
//! - The DShot150/300/600 timing table

pub mod frame;
pub mod protocol;
pub mod waveform;

pub use frame::encode_throttle_frame;
pub use protocol::{DshotRate, Pulse, TimingProfile};
pub use waveform::build_waveform;
