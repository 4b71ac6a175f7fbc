use cava_pipe::{
    spawn_fifo_ingestion, spawn_reader_ingestion, FifoOptions, FrameSource, Frontend,
    JsonBaselineStore, OverlayConfig, RenderLoop, SharedFrameBuffer, TickOutcome,
};
use cava_viz::{BaselineStore, Command, DisplayMode, RenderOutput};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecordingFrontend {
    outputs: Vec<RenderOutput>,
    script: VecDeque<Vec<Command>>,
}

impl Frontend for RecordingFrontend {
    type Error = std::convert::Infallible;

    fn present(&mut self, output: &RenderOutput) -> Result<(), Self::Error> {
        self.outputs.push(output.clone());
        Ok(())
    }

    fn poll_commands(&mut self) -> Vec<Command> {
        self.script.pop_front().unwrap_or_default()
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn test_frame_source_end_to_end() {
    let frames: Vec<_> = FrameSource::new(Cursor::new(b"10;20;30\n5;x;15\n".to_vec())).collect();
    assert_eq!(frames, vec![vec![10, 20, 30], vec![5, 15]]);
}

#[test]
fn test_ingested_frames_reach_render_output() {
    let buffer = Arc::new(SharedFrameBuffer::new(256));
    let input = b"10;20;30\n5;x;15\n40;40;40;40\n".to_vec();
    let handle = spawn_reader_ingestion(Cursor::new(input), Arc::clone(&buffer)).unwrap();
    assert_eq!(handle.join().unwrap(), 3);

    let dir = tempfile::tempdir().unwrap();
    let config = OverlayConfig {
        baseline_path: dir.path().join("baseline.json"),
        screen_width: 301,
        ..OverlayConfig::default()
    };
    let store = JsonBaselineStore::new(&config.baseline_path);
    let mut render_loop =
        RenderLoop::from_config(&config, buffer, store, 3, RecordingFrontend::default()).unwrap();

    assert_eq!(render_loop.tick(secs(0)).unwrap(), TickOutcome::Continue);
    let output = render_loop.frontend().outputs.last().unwrap();
    assert_eq!(output.background, 0);

    let wave = output.waveform.as_ref().unwrap();
    assert_eq!(wave.len(), 4);
    let xs: Vec<i32> = wave.upper.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0, 100, 200, 300]);
    assert!(wave.upper.iter().all(|p| p.y == 180));
    assert!(wave.lower.iter().all(|p| p.y == 220));
}

#[test]
fn test_calibration_is_persisted_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let config = OverlayConfig {
        baseline_path: dir.path().join("baseline.json"),
        capture_duration_secs: 3.0,
        ..OverlayConfig::default()
    };

    let buffer = Arc::new(SharedFrameBuffer::new(0));
    buffer.publish(vec![8, 12, 4]);

    let mut frontend = RecordingFrontend::default();
    frontend.script.push_back(vec![Command::BeginCalibration]);
    let store = JsonBaselineStore::new(&config.baseline_path);
    let mut render_loop =
        RenderLoop::from_config(&config, Arc::clone(&buffer), store, 1, frontend).unwrap();

    for t in 0..=3 {
        render_loop.tick(secs(t)).unwrap();
    }
    assert!(!render_loop.calibrator().is_capturing());

    let mut reopened = JsonBaselineStore::new(&config.baseline_path);
    assert_eq!(reopened.load().unwrap(), Some(vec![8, 12, 4]));

    // A fresh loop picks the baseline up at startup
    let store = JsonBaselineStore::new(&config.baseline_path);
    let render_loop =
        RenderLoop::from_config(&config, buffer, store, 1, RecordingFrontend::default()).unwrap();
    assert_eq!(render_loop.calibrator().baseline(), Some(&[8, 12, 4][..]));
}

#[test]
fn test_mode_switch_and_quit() {
    let buffer = Arc::new(SharedFrameBuffer::new(8));
    let mut frontend = RecordingFrontend::default();
    frontend.script.push_back(vec![Command::SelectMode(DisplayMode(1))]);
    frontend.script.push_back(vec![]);
    frontend.script.push_back(vec![Command::Quit]);

    let store = JsonBaselineStore::new(tempfile::tempdir().unwrap().path().join("b.json"));
    let mut render_loop = RenderLoop::from_config(
        &OverlayConfig::default(),
        buffer,
        store,
        2,
        frontend,
    )
    .unwrap();

    assert_eq!(render_loop.tick(secs(0)).unwrap(), TickOutcome::Continue);
    assert_eq!(render_loop.tick(secs(1)).unwrap(), TickOutcome::Continue);
    assert_eq!(render_loop.tick(secs(2)).unwrap(), TickOutcome::Quit);

    let backgrounds: Vec<usize> = render_loop
        .frontend()
        .outputs
        .iter()
        .map(|o| o.background)
        .collect();
    assert_eq!(backgrounds, vec![0, 1, 1]);
    assert!(render_loop.frontend().outputs[1].waveform.is_none());
}

#[test]
fn test_fifo_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cava.fifo");
    let buffer = Arc::new(SharedFrameBuffer::new(0));

    let handle = spawn_fifo_ingestion(
        FifoOptions {
            path: path.clone(),
            create: true,
            reopen_on_close: false,
        },
        Arc::clone(&buffer),
    )
    .unwrap();

    {
        let mut writer = OpenOptions::new().write(true).open(&path).unwrap();
        writer.write_all(b"1;2;3\nnoise\n4;5;6\n").unwrap();
    }

    assert_eq!(handle.join().unwrap(), 2);
    assert!(buffer.is_source_closed());
    assert_eq!(buffer.snapshot(), vec![4, 5, 6]);
}
