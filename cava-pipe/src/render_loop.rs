//! Fixed-cadence driver that turns the latest frame into geometry.

use cava_viz::{
    trim_high_bins, BaselineCalibrator, BaselineStore, CalibrationStatus, Command, DisplayMode,
    DisplayModeController, RenderOutput, Scaler, ScalingStrategy, Waveform, WaveformGenerator,
};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::OverlayConfig;
use crate::error::{ConfigError, RenderError};
use crate::shared_frame_buffer::SharedFrameBuffer;

/// Presentation layer seen from the render loop: it draws what each tick
/// produced and hands back whatever operator input arrived since.
pub trait Frontend {
    type Error: fmt::Display;

    fn present(&mut self, output: &RenderOutput) -> Result<(), Self::Error>;

    fn poll_commands(&mut self) -> Vec<Command>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

/// Transitions of the ingestion side worth telling the operator about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    Stalled,
    Resumed,
    Closed,
}

/// Tracks whether frames are still arriving.
///
/// A stalled or closed source is only reported; the last frame stays on
/// screen either way.
#[derive(Debug)]
pub struct SourceWatch {
    stale_after: Duration,
    last_sequence: u64,
    last_change: Duration,
    stalled: bool,
    closed_reported: bool,
}

impl SourceWatch {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            last_sequence: 0,
            last_change: Duration::ZERO,
            stalled: false,
            closed_reported: false,
        }
    }

    pub fn observe(&mut self, sequence: u64, closed: bool, now: Duration) -> Option<SourceEvent> {
        if sequence != self.last_sequence {
            self.last_sequence = sequence;
            self.last_change = now;
            self.closed_reported = false;
            if self.stalled {
                self.stalled = false;
                return Some(SourceEvent::Resumed);
            }
            return None;
        }

        if closed && !self.closed_reported {
            self.closed_reported = true;
            return Some(SourceEvent::Closed);
        }

        if !self.stalled && now.saturating_sub(self.last_change) > self.stale_after {
            self.stalled = true;
            return Some(SourceEvent::Stalled);
        }
        None
    }
}

pub struct RenderLoop<S, F> {
    buffer: Arc<SharedFrameBuffer>,
    calibrator: BaselineCalibrator<S>,
    scaler: Scaler,
    generator: WaveformGenerator,
    modes: DisplayModeController,
    frontend: F,
    trim_high_bins: usize,
    tick_interval: Duration,
    source_watch: SourceWatch,
    last_countdown: Option<u64>,
}

impl<S, F> RenderLoop<S, F>
where
    S: BaselineStore,
    S::Error: fmt::Display,
    F: Frontend,
{
    pub fn new(
        buffer: Arc<SharedFrameBuffer>,
        calibrator: BaselineCalibrator<S>,
        scaler: Scaler,
        generator: WaveformGenerator,
        modes: DisplayModeController,
        frontend: F,
    ) -> Self {
        Self {
            buffer,
            calibrator,
            scaler,
            generator,
            modes,
            frontend,
            trim_high_bins: 0,
            tick_interval: Duration::from_secs(1) / 60,
            source_watch: SourceWatch::new(Duration::from_secs(2)),
            last_countdown: None,
        }
    }

    /// Wires every component from `config`, loading the stored baseline.
    ///
    /// `mode_count` is the number of backgrounds the frontend can show.
    pub fn from_config(
        config: &OverlayConfig,
        buffer: Arc<SharedFrameBuffer>,
        store: S,
        mode_count: u8,
        frontend: F,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.primary_mode >= mode_count {
            return Err(ConfigError::Invalid {
                field: "primary_mode",
                reason: format!("only {mode_count} backgrounds are available"),
            });
        }

        let mut calibrator = BaselineCalibrator::new(store, config.capture_duration());
        match calibrator.load_baseline() {
            Ok(true) => info!(
                "[calibration] loaded baseline with {} bins",
                calibrator.baseline().map_or(0, <[u32]>::len)
            ),
            Ok(false) => info!("[calibration] no saved baseline, frames are shown unfiltered"),
            Err(err) => warn!("[calibration] could not load baseline, continuing without: {err}"),
        }

        let scaler = Scaler::new(
            config.scaling.into(),
            config.sensitivity.to_sensitivity(),
            config.max_height(),
        );
        let generator =
            WaveformGenerator::new(config.screen_width.saturating_sub(1), config.center_y());
        let modes = DisplayModeController::new(
            mode_count,
            config.primary(),
            config.auto_revertible_modes(),
            config.switch_timeout(),
        );

        Ok(Self::new(buffer, calibrator, scaler, generator, modes, frontend)
            .with_trim_high_bins(config.trim_high_bins)
            .with_tick_interval(config.tick_interval())
            .with_stale_after(config.stale_after()))
    }

    pub fn with_trim_high_bins(mut self, count: usize) -> Self {
        self.trim_high_bins = count;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.source_watch = SourceWatch::new(stale_after);
        self
    }

    /// Ticks at the configured cadence until a quit command arrives.
    pub fn run(&mut self) -> Result<(), RenderError> {
        let start = Instant::now();
        let mut next_tick = start;
        info!(
            "[render] starting at {:.1} ticks/s",
            1.0 / self.tick_interval.as_secs_f64()
        );

        loop {
            if self.tick(start.elapsed())? == TickOutcome::Quit {
                info!("[render] quit requested");
                return Ok(());
            }

            next_tick += self.tick_interval;
            let current = Instant::now();
            if next_tick > current {
                thread::sleep(next_tick - current);
            } else {
                // Fell behind; don't try to catch up with a burst of ticks
                next_tick = current;
            }
        }
    }

    /// One pass of the loop at time `now` (measured from loop start).
    pub fn tick(&mut self, now: Duration) -> Result<TickOutcome, RenderError> {
        if let Some(left) = self.modes.tick(now) {
            info!("[mode] {left} timed out, back to {}", self.modes.current());
        }
        self.watch_source(now);

        let waveform = if self.modes.is_primary() {
            self.process_frame(now)
        } else {
            None
        };
        let output = RenderOutput {
            background: self.modes.current().background_index(),
            waveform,
        };
        self.frontend
            .present(&output)
            .map_err(|err| RenderError::Frontend(err.to_string()))?;

        for command in self.frontend.poll_commands() {
            if self.apply(command, now) == TickOutcome::Quit {
                return Ok(TickOutcome::Quit);
            }
        }
        Ok(TickOutcome::Continue)
    }

    fn process_frame(&mut self, now: Duration) -> Option<Waveform> {
        let mut frame = self.buffer.snapshot();
        trim_high_bins(&mut frame, self.trim_high_bins);

        match self.calibrator.tick(&frame, now) {
            Ok(status) => self.report_calibration(status),
            Err(err) => error!("[calibration] baseline applied but not saved: {err}"),
        }

        let filtered = if self.calibrator.is_capturing() {
            frame
        } else {
            self.calibrator.subtract(&frame)
        };
        let scaled = self.scaler.scale(&filtered);
        self.generator.generate(&scaled)
    }

    fn report_calibration(&mut self, status: CalibrationStatus) {
        match status {
            CalibrationStatus::Idle => {}
            CalibrationStatus::Capturing { remaining, captured } => {
                let countdown = remaining.as_secs_f64().ceil() as u64;
                if self.last_countdown != Some(countdown) {
                    self.last_countdown = Some(countdown);
                    info!("[calibration] capturing baseline, {countdown}s remaining ({captured} frames)");
                }
            }
            CalibrationStatus::Committed {
                bins,
                frames_used,
                frames_dropped,
            } => {
                self.last_countdown = None;
                info!(
                    "[calibration] new baseline: {bins} bins from {frames_used} frames ({frames_dropped} dropped for length)"
                );
            }
            CalibrationStatus::NoData => {
                self.last_countdown = None;
                warn!("[calibration] no data collected, keeping the previous baseline");
            }
        }
    }

    fn watch_source(&mut self, now: Duration) {
        let event = self.source_watch.observe(
            self.buffer.sequence(),
            self.buffer.is_source_closed(),
            now,
        );
        match event {
            Some(SourceEvent::Stalled) => warn!("[render] no signal, holding the last frame"),
            Some(SourceEvent::Resumed) => info!("[render] signal back"),
            Some(SourceEvent::Closed) => warn!("[render] frame source closed, display frozen"),
            None => {}
        }
    }

    fn apply(&mut self, command: Command, now: Duration) -> TickOutcome {
        match command {
            Command::SelectMode(mode) => self.select_mode(mode, now),
            Command::IncreaseSensitivity => {
                let value = self.scaler.sensitivity_mut().increase();
                self.report_sensitivity(value);
            }
            Command::DecreaseSensitivity => {
                let value = self.scaler.sensitivity_mut().decrease();
                self.report_sensitivity(value);
            }
            Command::BeginCalibration => {
                if self.calibrator.begin_calibration(now) {
                    info!(
                        "[calibration] recording baseline for {:.1}s, keep the room quiet",
                        self.calibrator.capture_duration().as_secs_f32()
                    );
                } else {
                    debug!("[calibration] already capturing, ignoring request");
                }
            }
            Command::Quit => return TickOutcome::Quit,
        }
        TickOutcome::Continue
    }

    fn select_mode(&mut self, mode: DisplayMode, now: Duration) {
        if self.modes.select_mode(mode, now) {
            info!("[mode] switched to {mode}");
        } else {
            debug!(
                "[mode] ignoring {mode}, only {} available",
                self.modes.mode_count()
            );
        }
    }

    fn report_sensitivity(&self, value: f32) {
        if self.scaler.strategy() == ScalingStrategy::DynamicMax {
            info!("[scaler] sensitivity {value:.1} (inactive while dynamic scaling is on)");
        } else {
            info!("[scaler] sensitivity {value:.1}");
        }
    }

    pub fn modes(&self) -> &DisplayModeController {
        &self.modes
    }

    pub fn calibrator(&self) -> &BaselineCalibrator<S> {
        &self.calibrator
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }
}
