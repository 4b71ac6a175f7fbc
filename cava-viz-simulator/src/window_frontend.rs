use cava_pipe::{Frontend, OverlayConfig};
use cava_viz::color_strategy::ColorMode;
use cava_viz::{Command, RenderOutput, Renderer, WaveformRenderer};
use embedded_graphics::{pixelcolor::Rgb888, prelude::*};
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window};
use std::convert::Infallible;

use crate::backgrounds::Background;
use crate::keymap::command_for_key;

/// Simulator window acting as the overlay's presentation layer.
pub struct WindowFrontend {
    display: SimulatorDisplay<Rgb888>,
    window: Window,
    backgrounds: Vec<Background>,
    renderer: WaveformRenderer,
}

impl WindowFrontend {
    /// `backgrounds` must not be empty.
    pub fn new(config: &OverlayConfig, backgrounds: Vec<Background>) -> Self {
        let display = SimulatorDisplay::new(Size::new(config.screen_width, config.screen_height));
        let window = Window::new(
            "CAVA Visualization Overlay",
            &OutputSettingsBuilder::new().scale(1).build(),
        );
        let renderer = WaveformRenderer::new(
            config.center_y(),
            config.max_height(),
            config.stroke_width,
            ColorMode::from(config.wave_color).into_strategy(),
        );

        Self {
            display,
            window,
            backgrounds,
            renderer,
        }
    }

    pub fn mode_count(&self) -> u8 {
        self.backgrounds.len().min(u8::MAX as usize) as u8
    }
}

impl Frontend for WindowFrontend {
    type Error = Infallible;

    fn present(&mut self, output: &RenderOutput) -> Result<(), Infallible> {
        let last = self.backgrounds.len().saturating_sub(1);
        if let Some(background) = self.backgrounds.get(output.background.min(last)) {
            background.draw(&mut self.display)?;
        }
        if let Some(waveform) = &output.waveform {
            self.renderer.draw(&mut self.display, waveform)?;
        }
        self.window.update(&self.display);
        Ok(())
    }

    fn poll_commands(&mut self) -> Vec<Command> {
        self.window
            .events()
            .filter_map(|event| match event {
                SimulatorEvent::Quit => Some(Command::Quit),
                // Ignore OS key repeat so a held key acts once
                SimulatorEvent::KeyDown {
                    keycode,
                    repeat: false,
                    ..
                } => command_for_key(&keycode.name()),
                _ => None,
            })
            .collect()
    }
}
