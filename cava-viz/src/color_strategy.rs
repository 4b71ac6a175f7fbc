use embedded_graphics::{pixelcolor::Rgb888, prelude::*};

/// The green the overlay has always drawn with.
pub const WAVE_GREEN: Rgb888 = Rgb888::new(0, 255, 0);

pub struct ColorContext {
    pub segment_index: usize,
    pub num_segments: usize,
    pub amplitude: u32,
    pub max_amplitude: u32,
}

pub trait ColorStrategy {
    fn get_color(&mut self, context: &ColorContext) -> Rgb888;

    /// Called once after every drawn frame.
    fn advance(&mut self) {}
}

/// Selectable by name from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Static,
    Spectrum,
    Gradient,
    ShiftingSpectrum,
}

impl ColorMode {
    pub fn into_strategy(self) -> alloc::boxed::Box<dyn ColorStrategy + Send> {
        match self {
            ColorMode::Static => alloc::boxed::Box::new(StaticColor(WAVE_GREEN)),
            ColorMode::Spectrum => alloc::boxed::Box::new(SpectrumColor),
            ColorMode::Gradient => alloc::boxed::Box::new(GradientColor),
            ColorMode::ShiftingSpectrum => alloc::boxed::Box::new(ShiftingSpectrumColor::new()),
        }
    }
}

/// Three 85-step ramps around the wheel: green to red, red to blue, blue
/// back to green.
fn wheel_color(pos: u8) -> Rgb888 {
    let pos = pos % 255;
    let rise = (pos % 85) * 3;
    let fall = 255 - rise;
    match pos / 85 {
        0 => Rgb888::new(rise, fall, 0),
        1 => Rgb888::new(fall, 0, rise),
        _ => Rgb888::new(0, rise, fall),
    }
}

fn wheel_position(index: usize, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    ((index as u64 * 255 / count as u64) % 255) as u8
}

pub struct StaticColor(pub Rgb888);
impl ColorStrategy for StaticColor {
    fn get_color(&mut self, _context: &ColorContext) -> Rgb888 {
        self.0
    }
}

pub struct SpectrumColor;
impl ColorStrategy for SpectrumColor {
    fn get_color(&mut self, context: &ColorContext) -> Rgb888 {
        wheel_color(wheel_position(
            context.segment_index,
            context.num_segments,
        ))
    }
}

pub struct GradientColor;
impl ColorStrategy for GradientColor {
    fn get_color(&mut self, context: &ColorContext) -> Rgb888 {
        if context.max_amplitude == 0 {
            return Rgb888::BLACK;
        }
        let intensity = (context.amplitude as f32 / context.max_amplitude as f32 * 255.0)
            .clamp(0.0, 255.0) as u8;
        Rgb888::new(0, intensity, 255u8.saturating_sub(intensity))
    }
}

/// Spectrum wheel that rotates one notch per frame.
pub struct ShiftingSpectrumColor {
    wheel_val: u8,
}
impl ShiftingSpectrumColor {
    pub fn new() -> Self {
        Self { wheel_val: 0 }
    }
}
impl Default for ShiftingSpectrumColor {
    fn default() -> Self {
        Self::new()
    }
}
impl ColorStrategy for ShiftingSpectrumColor {
    fn get_color(&mut self, context: &ColorContext) -> Rgb888 {
        wheel_color(
            wheel_position(context.segment_index, context.num_segments)
                .wrapping_add(self.wheel_val),
        )
    }

    fn advance(&mut self) {
        self.wheel_val = self.wheel_val.wrapping_add(1);
    }
}
