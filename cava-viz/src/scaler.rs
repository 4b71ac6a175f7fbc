use alloc::vec::Vec;

#[allow(unused_imports)]
use micromath::F32Ext;

use crate::frame::Frame;

/// Smallest height a scaled bin may take, so a silent bin still draws.
pub const MIN_SCALED_HEIGHT: u32 = 2;

/// How raw magnitudes are mapped into `[MIN_SCALED_HEIGHT, max_height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingStrategy {
    /// Multiply every bin by the operator-tuned sensitivity.
    SensitivityMultiplier,
    /// Stretch the loudest bin of each frame to `max_height`.
    DynamicMax,
}

/// Operator-tunable gain, stepped within a fixed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity {
    value: f32,
    step: f32,
    min: f32,
    max: f32,
}

impl Sensitivity {
    pub fn new(initial: f32, step: f32, min: f32, max: f32) -> Self {
        Self {
            value: initial.clamp(min, max),
            step,
            min,
            max,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Raises the gain by one step. Returns the new value.
    pub fn increase(&mut self) -> f32 {
        self.adjust(self.step)
    }

    /// Lowers the gain by one step. Returns the new value.
    pub fn decrease(&mut self) -> f32 {
        self.adjust(-self.step)
    }

    fn adjust(&mut self, delta: f32) -> f32 {
        // Snap to the step grid so repeated presses don't accumulate drift
        let stepped = ((self.value + delta) / self.step).round() * self.step;
        self.value = stepped.clamp(self.min, self.max);
        self.value
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self::new(1.0, 0.1, 0.1, 5.0)
    }
}

/// Normalizes frames into a bounded display range.
pub struct Scaler {
    strategy: ScalingStrategy,
    sensitivity: Sensitivity,
    max_height: u32,
}

impl Scaler {
    pub fn new(strategy: ScalingStrategy, sensitivity: Sensitivity, max_height: u32) -> Self {
        Self {
            strategy,
            sensitivity,
            max_height: max_height.max(MIN_SCALED_HEIGHT),
        }
    }

    /// Scales every bin with the configured strategy.
    ///
    /// Each output bin is in `[MIN_SCALED_HEIGHT, max_height]` whatever the
    /// input magnitude.
    pub fn scale(&self, frame: &[u32]) -> Frame {
        match self.strategy {
            ScalingStrategy::SensitivityMultiplier => {
                scale_by_sensitivity(frame, self.sensitivity.value(), self.max_height)
            }
            ScalingStrategy::DynamicMax => scale_to_frame_max(frame, self.max_height),
        }
    }

    pub fn strategy(&self) -> ScalingStrategy {
        self.strategy
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity.value()
    }

    pub fn sensitivity_mut(&mut self) -> &mut Sensitivity {
        &mut self.sensitivity
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }
}

/// `clamp(round(v * sensitivity), MIN_SCALED_HEIGHT, max_height)` per bin.
pub fn scale_by_sensitivity(frame: &[u32], sensitivity: f32, max_height: u32) -> Frame {
    frame
        .iter()
        .map(|&value| clamp_height(value as f32 * sensitivity, max_height))
        .collect()
}

/// `clamp(round(v * max_height / m), MIN_SCALED_HEIGHT, max_height)` per bin,
/// with `m` the frame maximum, or 1 for an all-zero frame.
pub fn scale_to_frame_max(frame: &[u32], max_height: u32) -> Frame {
    let peak = frame.iter().copied().max().unwrap_or(0).max(1) as f32;
    let gain = max_height as f32 / peak;
    frame
        .iter()
        .map(|&value| clamp_height(value as f32 * gain, max_height))
        .collect::<Vec<_>>()
}

fn clamp_height(scaled: f32, max_height: u32) -> u32 {
    let max_height = max_height.max(MIN_SCALED_HEIGHT);
    // NaN and negatives collapse onto the floor through the clamp
    let rounded = scaled.round().clamp(MIN_SCALED_HEIGHT as f32, max_height as f32);
    (rounded as u32).clamp(MIN_SCALED_HEIGHT, max_height)
}
