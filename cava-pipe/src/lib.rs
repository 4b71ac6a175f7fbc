//! Runtime around `cava-viz`: ingestion thread, frame handoff, baseline
//! persistence, configuration and the fixed-cadence render loop.

pub mod baseline_store;
pub mod config;
pub mod error;
pub mod frame_source;
pub mod render_loop;
pub mod shared_frame_buffer;
pub mod telemetry;

pub use baseline_store::JsonBaselineStore;
pub use config::OverlayConfig;
pub use error::{ConfigError, RenderError, SourceError, StoreError};
pub use frame_source::{
    spawn_fifo_ingestion, spawn_reader_ingestion, FifoOptions, FrameSource, IngestionHandle,
};
pub use render_loop::{Frontend, RenderLoop, SourceEvent, TickOutcome};
pub use shared_frame_buffer::SharedFrameBuffer;
