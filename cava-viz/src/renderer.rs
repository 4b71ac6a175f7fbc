use alloc::boxed::Box;

use embedded_graphics::{
    draw_target::DrawTarget,
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};

use crate::color_strategy::{ColorContext, ColorStrategy};
use crate::waveform_generator::Waveform;

/// Everything the presentation layer needs for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub background: usize,
    /// `None` outside the primary mode, or when the frame had under two bins.
    pub waveform: Option<Waveform>,
}

pub trait Renderer {
    fn draw<D: DrawTarget<Color = Rgb888>>(
        &mut self,
        target: &mut D,
        waveform: &Waveform,
    ) -> Result<(), D::Error>;
}

/// Strokes both halves of a waveform as straight segments between bins.
pub struct WaveformRenderer {
    center_y: i32,
    max_height: u32,
    stroke_width: u32,
    color: Box<dyn ColorStrategy + Send>,
}

impl Renderer for WaveformRenderer {
    fn draw<D>(&mut self, target: &mut D, waveform: &Waveform) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let num_segments = waveform.len().saturating_sub(1);

        for (i, (upper, lower)) in waveform
            .upper
            .windows(2)
            .zip(waveform.lower.windows(2))
            .enumerate()
        {
            // Segment height is taken from its taller end
            let reach = (self.center_y - upper[0].y).max(self.center_y - upper[1].y);
            let color = self.color.get_color(&ColorContext {
                segment_index: i,
                num_segments,
                amplitude: (reach.max(0) as u32).saturating_mul(2),
                max_amplitude: self.max_height,
            });
            let style = PrimitiveStyle::with_stroke(color, self.stroke_width);

            Line::new(upper[0], upper[1]).into_styled(style).draw(target)?;
            Line::new(lower[0], lower[1]).into_styled(style).draw(target)?;
        }

        self.color.advance();
        Ok(())
    }
}

impl WaveformRenderer {
    pub fn new(
        center_y: i32,
        max_height: u32,
        stroke_width: u32,
        color: Box<dyn ColorStrategy + Send>,
    ) -> Self {
        Self {
            center_y,
            max_height,
            stroke_width: stroke_width.max(1),
            color,
        }
    }
}
