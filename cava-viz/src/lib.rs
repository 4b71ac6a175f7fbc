#![no_std]
//! Frame-to-geometry core of the overlay.
//!
//! Everything in here is pure and single-threaded: decoding analyzer lines,
//! baseline calibration, scaling, waveform synthesis, the display-mode state
//! machine and stroking the result onto an `embedded-graphics` draw target.
//! Threads, files and the window live in `cava-pipe` and the simulator.
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod baseline_calibrator;
pub mod color_strategy;
pub mod command;
pub mod display_mode;
pub mod frame;
pub mod renderer;
pub mod scaler;
pub mod waveform_generator;

pub use baseline_calibrator::{BaselineCalibrator, BaselineStore, CalibrationStatus};
pub use color_strategy::{ColorMode, ColorStrategy};
pub use command::Command;
pub use display_mode::{DisplayMode, DisplayModeController};
pub use frame::{parse_frame_line, trim_high_bins, Frame, FRAME_DELIMITER};
pub use renderer::{RenderOutput, Renderer, WaveformRenderer};
pub use scaler::{Scaler, ScalingStrategy, Sensitivity};
pub use waveform_generator::{Waveform, WaveformGenerator};
