//! Desktop overlay: draws the analyzer's spectrum as a mirrored waveform
//! over a selectable background.
//!
//! Usage:
//!   cava-viz-simulator --config cava-overlay.json --backgrounds ./backgrounds
//!
//! Keys: `1`-`9` pick a background, `Up`/`Down` change sensitivity, `R`
//! records a quiet-room baseline, `Q`/`Escape` quits.

mod backgrounds;
mod keymap;
mod window_frontend;

use anyhow::Context;
use cava_pipe::config::ScalingSetting;
use cava_pipe::{
    spawn_fifo_ingestion, telemetry, FifoOptions, JsonBaselineStore, OverlayConfig, RenderLoop,
    SharedFrameBuffer,
};
use clap::Parser;
use embedded_graphics::prelude::Size;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use window_frontend::WindowFrontend;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; defaults are used when it does not exist
    #[arg(short, long, default_value = "cava-overlay.json")]
    config: PathBuf,

    /// Named pipe the analyzer writes to
    #[arg(long)]
    fifo: Option<PathBuf>,

    /// Where the calibrated baseline is kept
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Directory of PNG backgrounds
    #[arg(long)]
    backgrounds: Option<PathBuf>,

    /// Normalize every frame to its own peak instead of using sensitivity
    #[arg(long)]
    dynamic: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn apply_to(&self, config: &mut OverlayConfig) {
        if let Some(fifo) = &self.fifo {
            config.fifo_path = fifo.clone();
        }
        if let Some(baseline) = &self.baseline {
            config.baseline_path = baseline.clone();
        }
        if let Some(backgrounds) = &self.backgrounds {
            config.backgrounds_dir = backgrounds.clone();
        }
        if self.dynamic {
            config.scaling = ScalingSetting::Dynamic;
        }
    }
}

fn main() -> anyhow::Result<()> {
    telemetry::init();
    let args = Args::parse();

    let mut config = OverlayConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply_to(&mut config);
    config.validate().context("invalid configuration")?;

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!(
        "[startup] {}x{}, fifo={}, baseline={}, scaling={:?}",
        config.screen_width,
        config.screen_height,
        config.fifo_path.display(),
        config.baseline_path.display(),
        config.scaling
    );

    let size = Size::new(config.screen_width, config.screen_height);
    let backgrounds = backgrounds::load_all(&config.backgrounds_dir, size)?;

    let buffer = Arc::new(SharedFrameBuffer::new(config.initial_bins));
    let ingestion = spawn_fifo_ingestion(
        FifoOptions {
            path: config.fifo_path.clone(),
            create: config.create_fifo,
            reopen_on_close: config.reopen_on_close,
        },
        Arc::clone(&buffer),
    )?;

    let frontend = WindowFrontend::new(&config, backgrounds);
    let mode_count = frontend.mode_count();
    let store = JsonBaselineStore::new(&config.baseline_path);
    let mut render_loop = RenderLoop::from_config(&config, buffer, store, mode_count, frontend)?;

    let result = render_loop.run();

    // The worker may be parked in a blocking read; it is left detached
    ingestion.stop();
    result?;
    Ok(())
}
