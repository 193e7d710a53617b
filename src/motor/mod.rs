//! # Motor Driver Module
//!
//! Owns one GPIO line and drives one ESC over it with DShot frames.
//!
//! Lifecycle: construct (claims the line) → [`arm`](DshotMotor::arm) →
//! any number of [`send_throttle`](DshotMotor::send_throttle) calls →
//! [`close`](DshotMotor::close) (consumes the driver and releases the line).

use crate::dshot::{build_waveform, encode_throttle_frame, DshotRate, TimingProfile};
use crate::error::Result;
use crate::gpio::GpioWaveformIO;
use std::time::Duration;
use tokio::time::{interval, sleep, Instant};
use tracing::{debug, info, warn};

/// How often the completion signal is polled after submitting a waveform
const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Pacing for the arming and shutdown loops
///
/// ESC firmware requires a continuous disarmed signal before accepting
/// throttle, and shutdown repeats the stop command because any single
/// DShot frame may be dropped.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Minimum length of the arming window
    pub arm_duration: Duration,

    /// Interval between repeated zero-throttle frames (~100 Hz)
    pub frame_interval: Duration,

    /// Zero-throttle frames sent during shutdown
    pub shutdown_repeats: u32,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            arm_duration: Duration::from_secs(2),
            frame_interval: Duration::from_millis(10),
            shutdown_repeats: 10,
        }
    }
}

/// DShot motor driver bound to a single GPIO line
///
/// The line is claimed exclusively at construction and released exactly once
/// by [`close`](DshotMotor::close), which takes the driver by value: a
/// closed driver cannot be used or closed again.
pub struct DshotMotor<IO: GpioWaveformIO> {
    io: IO,
    line: u8,
    rate: DshotRate,
    timing: TimingProfile,
    pacing: Pacing,
}

impl<IO: GpioWaveformIO> std::fmt::Debug for DshotMotor<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DshotMotor")
            .field("line", &self.line)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl<IO: GpioWaveformIO> DshotMotor<IO> {
    /// Claim `line` and prepare it for DShot output at `rate_key`
    ///
    /// # Arguments
    ///
    /// * `io` - GPIO capability; owned by the driver until `close`
    /// * `line` - GPIO line number wired to the ESC signal input
    /// * `rate_key` - Numeric speed class (150, 300 or 600)
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedRate` for a rate key outside the timing table
    /// (checked before the line is claimed) and `Resource` if the line
    /// cannot be claimed.
    pub fn new(io: IO, line: u8, rate_key: u16) -> Result<Self> {
        Self::with_pacing(io, line, rate_key, Pacing::default())
    }

    /// Like [`new`](DshotMotor::new), with explicit arming/shutdown pacing
    pub fn with_pacing(mut io: IO, line: u8, rate_key: u16, pacing: Pacing) -> Result<Self> {
        let rate = DshotRate::from_key(rate_key)?;
        io.claim_output(line)?;
        info!("Motor on GPIO {} initialized for {}", line, rate);

        Ok(Self {
            io,
            line,
            rate,
            timing: rate.timing(),
            pacing,
        })
    }

    /// GPIO line this driver owns
    pub fn line(&self) -> u8 {
        self.line
    }

    /// Selected speed class
    pub fn rate(&self) -> DshotRate {
        self.rate
    }

    /// Transmit one throttle command and wait for it to leave the wire
    ///
    /// Clamps `throttle` to `[0.0, 1.0]`, encodes a frame, expands it to a
    /// waveform and submits it, then polls the line's busy signal until the
    /// transmission completes. Frames on one line never overlap; overlapping
    /// transmissions would corrupt what the ESC receives.
    ///
    /// # Returns
    ///
    /// * `u16` - The transmitted frame value
    ///
    /// # Errors
    ///
    /// Propagates `Transmission` errors from the GPIO layer. There is no
    /// automatic retry: a lost frame is superseded by the next send.
    pub async fn send_throttle(&mut self, throttle: f64, telemetry: bool) -> Result<u16> {
        let frame = encode_throttle_frame(throttle, telemetry);
        let pulses = build_waveform(frame, self.timing, self.line);

        let handle = self.io.submit_waveform(self.line, &pulses)?;
        while self.io.is_busy(handle)? {
            sleep(BUSY_POLL_INTERVAL).await;
        }

        debug!("Sent frame {:#06x} on GPIO {}", frame, self.line);
        Ok(frame)
    }

    /// Run the arming sequence
    ///
    /// Repeats zero-throttle frames at the configured cadence for the full
    /// arming window. ESCs demand this disarmed-signal period before they
    /// accept nonzero throttle. Individual frame failures are logged and the
    /// loop continues; repetition provides the redundancy.
    pub async fn arm(&mut self) {
        info!(
            "Arming: zero throttle for {:.1}s on GPIO {}",
            self.pacing.arm_duration.as_secs_f64(),
            self.line
        );

        let start = Instant::now();
        let mut cadence = interval(self.pacing.frame_interval);
        while start.elapsed() < self.pacing.arm_duration {
            cadence.tick().await;
            if let Err(e) = self.send_throttle(0.0, false).await {
                warn!("Arming frame failed, continuing: {}", e);
            }
        }

        info!("Arming complete, motor ready");
    }

    /// Stop the motor and release the line
    ///
    /// Sends the zero-throttle command several times (best-effort, failures
    /// logged), then drives the line low and releases it. Consumes the
    /// driver, so the release happens exactly once.
    ///
    /// # Errors
    ///
    /// Returns `Resource` errors from the final write/release; those are
    /// fatal and must not be ignored by callers.
    pub async fn close(mut self) -> Result<()> {
        info!("Stopping motor on GPIO {}", self.line);

        let mut cadence = interval(self.pacing.frame_interval);
        for _ in 0..self.pacing.shutdown_repeats {
            cadence.tick().await;
            if let Err(e) = self.send_throttle(0.0, false).await {
                warn!("Shutdown frame failed, continuing: {}", e);
            }
        }

        self.io.write(self.line, false)?;
        self.io.release(self.line)?;
        info!("GPIO {} released", self.line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dshot::protocol::DSHOT_PULSES_PER_FRAME;
    use crate::error::EscBridgeError;
    use crate::gpio::output_trait::mocks::MockGpio;
    use tokio_test::assert_ok;

    const LINE: u8 = 18;

    fn fast_pacing() -> Pacing {
        Pacing {
            arm_duration: Duration::from_millis(200),
            frame_interval: Duration::from_millis(10),
            shutdown_repeats: 10,
        }
    }

    #[test]
    fn test_new_claims_the_line() {
        let gpio = MockGpio::new();
        let motor = DshotMotor::new(gpio.clone(), LINE, 300).unwrap();

        assert_eq!(gpio.claimed_lines(), vec![LINE]);
        assert_eq!(motor.line(), LINE);
        assert_eq!(motor.rate(), DshotRate::Dshot300);
    }

    #[test]
    fn test_new_rejects_unsupported_rate_before_claiming() {
        let gpio = MockGpio::new();
        let result = DshotMotor::new(gpio.clone(), LINE, 999);

        match result.unwrap_err() {
            EscBridgeError::UnsupportedRate(key) => assert_eq!(key, 999),
            other => panic!("Expected UnsupportedRate, got: {:?}", other),
        }

        // The line must never be claimed when construction fails
        assert!(gpio.claimed_lines().is_empty());
    }

    #[test]
    fn test_new_propagates_claim_failure() {
        let gpio = MockGpio::new();
        gpio.set_claim_error("line held by another process");

        let result = DshotMotor::new(gpio, LINE, 300);
        match result.unwrap_err() {
            EscBridgeError::Resource(msg) => assert!(msg.contains("another process")),
            other => panic!("Expected Resource error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_throttle_returns_encoded_frame() {
        let gpio = MockGpio::new();
        let mut motor = DshotMotor::new(gpio.clone(), LINE, 300).unwrap();

        let frame = tokio_test::assert_ok!(motor.send_throttle(0.5, false).await);
        assert_eq!(frame, encode_throttle_frame(0.5, false));

        let submitted = gpio.submitted_waveforms();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, LINE);
        assert_eq!(submitted[0].1.len(), DSHOT_PULSES_PER_FRAME);
    }

    #[tokio::test]
    async fn test_send_throttle_clamps_out_of_range() {
        let gpio = MockGpio::new();
        let mut motor = DshotMotor::new(gpio, LINE, 300).unwrap();

        // 1.5 saturates to full throttle; no error raised
        let frame = motor.send_throttle(1.5, false).await.unwrap();
        assert_eq!(frame, encode_throttle_frame(1.0, false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_throttle_waits_for_busy_line() {
        let gpio = MockGpio::new();
        let mut motor = DshotMotor::new(gpio.clone(), LINE, 300).unwrap();

        gpio.set_busy_polls(3);
        motor.send_throttle(0.2, false).await.unwrap();

        // The driver must have polled through every busy report before returning
        assert_eq!(*gpio.busy_polls_seen.lock().unwrap(), 3);
        assert_eq!(*gpio.busy_polls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_throttle_propagates_transmission_error() {
        let gpio = MockGpio::new();
        let mut motor = DshotMotor::new(gpio.clone(), LINE, 300).unwrap();

        gpio.set_submit_error("wave queue full");
        let result = motor.send_throttle(0.4, false).await;

        match result.unwrap_err() {
            EscBridgeError::Transmission { line, reason } => {
                assert_eq!(line, LINE);
                assert!(reason.contains("wave queue full"));
            }
            other => panic!("Expected Transmission error, got: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_sends_zero_throttle_for_full_window() {
        let gpio = MockGpio::new();
        let mut motor =
            DshotMotor::with_pacing(gpio.clone(), LINE, 300, fast_pacing()).unwrap();

        motor.arm().await;

        let submitted = gpio.submitted_waveforms();
        // 200ms window at 10ms cadence
        assert!(
            submitted.len() >= 20,
            "expected at least 20 arming frames, got {}",
            submitted.len()
        );

        // Every arming frame is the all-zero disarm frame
        let disarm = build_waveform(0, DshotRate::Dshot300.timing(), LINE);
        for (line, pulses) in &submitted {
            assert_eq!(*line, LINE);
            assert_eq!(pulses, &disarm);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_continues_past_transmission_errors() {
        let gpio = MockGpio::new();
        let mut motor =
            DshotMotor::with_pacing(gpio.clone(), LINE, 300, fast_pacing()).unwrap();

        gpio.set_submit_error("transient failure");
        // Best-effort: arm() must run to completion despite every frame failing
        motor.arm().await;
        assert!(gpio.submitted_waveforms().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_without_arm_sends_shutdown_frames_and_releases() {
        let gpio = MockGpio::new();
        let motor = DshotMotor::new(gpio.clone(), LINE, 300).unwrap();

        motor.close().await.unwrap();

        // At least 10 zero-throttle frames even though arm() never ran
        let submitted = gpio.submitted_waveforms();
        assert_eq!(submitted.len(), 10);
        let disarm = build_waveform(0, DshotRate::Dshot300.timing(), LINE);
        for (_, pulses) in &submitted {
            assert_eq!(pulses, &disarm);
        }

        // Line driven low, then released
        assert!(gpio.writes.lock().unwrap().contains(&(LINE, false)));
        assert_eq!(gpio.released_lines(), vec![LINE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_releases_line_even_when_frames_fail() {
        let gpio = MockGpio::new();
        let motor = DshotMotor::new(gpio.clone(), LINE, 300).unwrap();

        gpio.set_submit_error("wire fault");
        motor.close().await.unwrap();

        assert_eq!(gpio.released_lines(), vec![LINE]);
    }

    #[test]
    fn test_default_pacing_matches_esc_requirements() {
        let pacing = Pacing::default();
        assert_eq!(pacing.arm_duration, Duration::from_secs(2));
        assert_eq!(pacing.frame_interval, Duration::from_millis(10));
        assert_eq!(pacing.shutdown_repeats, 10);
    }
}
