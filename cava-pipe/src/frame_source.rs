use cava_viz::{parse_frame_line, Frame};
use nix::sys::stat::Mode;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::SourceError;
use crate::shared_frame_buffer::SharedFrameBuffer;

/// Decodes analyzer lines from a byte stream into frames.
///
/// The sequence ends for good on end of stream or the first read error;
/// lines without a single valid bin are skipped.
pub struct FrameSource<R> {
    reader: R,
    line: Vec<u8>,
    exhausted: bool,
}

impl<R: BufRead> FrameSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(4096),
            exhausted: false,
        }
    }
}

impl<R: BufRead> Iterator for FrameSource<R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        while !self.exhausted {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.exhausted = true;
                }
                Ok(_) => {
                    // Stray non-UTF-8 bytes become noise tokens and get dropped
                    let text = String::from_utf8_lossy(&self.line);
                    if let Some(frame) = parse_frame_line(&text) {
                        return Some(frame);
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!("[ingest] read failed, ending frame source: {err}");
                    self.exhausted = true;
                }
            }
        }
        None
    }
}

/// Settings for the named-pipe ingestion worker.
#[derive(Debug, Clone)]
pub struct FifoOptions {
    pub path: PathBuf,
    pub create: bool,
    pub reopen_on_close: bool,
}

/// Handle on the background ingestion thread.
///
/// Dropping the handle detaches the thread. [`stop`](Self::stop) asks it to
/// exit before its next publish or reopen; a thread parked in a blocking
/// read only notices once the read returns.
pub struct IngestionHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<u64>,
}

impl IngestionHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker and returns how many frames it published.
    pub fn join(self) -> thread::Result<u64> {
        self.thread.join()
    }
}

/// Publishes every frame of `source` until it ends or `stop` is raised.
pub fn pump<R: BufRead>(
    source: FrameSource<R>,
    buffer: &SharedFrameBuffer,
    stop: &AtomicBool,
) -> u64 {
    let mut published = 0;
    for frame in source {
        if stop.load(Ordering::Acquire) {
            break;
        }
        buffer.publish(frame);
        published += 1;
    }
    published
}

/// Runs a [`FrameSource`] over `reader` on its own thread.
pub fn spawn_reader_ingestion<R>(
    reader: R,
    buffer: Arc<SharedFrameBuffer>,
) -> Result<IngestionHandle, SourceError>
where
    R: BufRead + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name("frame-ingest".into())
        .spawn(move || {
            let published = pump(FrameSource::new(reader), &buffer, &worker_stop);
            info!("[ingest] source exhausted after {published} frames");
            buffer.mark_source_closed();
            published
        })
        .map_err(SourceError::Spawn)?;

    Ok(IngestionHandle { stop, thread })
}

/// Reads frames from the named pipe at `options.path` on its own thread.
///
/// The pipe is created first when it is missing and `options.create` is
/// set. Opening happens on the worker because opening a FIFO blocks until
/// the analyzer connects.
pub fn spawn_fifo_ingestion(
    options: FifoOptions,
    buffer: Arc<SharedFrameBuffer>,
) -> Result<IngestionHandle, SourceError> {
    if options.create {
        ensure_fifo(&options.path)?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name("frame-ingest".into())
        .spawn(move || run_fifo_worker(&options, &buffer, &worker_stop))
        .map_err(SourceError::Spawn)?;

    Ok(IngestionHandle { stop, thread })
}

fn run_fifo_worker(options: &FifoOptions, buffer: &SharedFrameBuffer, stop: &AtomicBool) -> u64 {
    let mut total = 0;
    loop {
        debug!("[ingest] waiting for writer on {}", options.path.display());
        let file = match File::open(&options.path) {
            Ok(file) => file,
            Err(source) => {
                let err = SourceError::Open {
                    path: options.path.clone(),
                    source,
                };
                error!("[ingest] {err}");
                buffer.mark_source_closed();
                break;
            }
        };
        if stop.load(Ordering::Acquire) {
            break;
        }

        info!("[ingest] reading frames from {}", options.path.display());
        buffer.mark_source_open();
        let published = pump(FrameSource::new(BufReader::new(file)), buffer, stop);
        total += published;
        buffer.mark_source_closed();
        info!("[ingest] writer disconnected after {published} frames");

        if !options.reopen_on_close || stop.load(Ordering::Acquire) {
            break;
        }
    }
    total
}

/// Creates a named pipe at `path` unless something already exists there.
pub fn ensure_fifo(path: &Path) -> Result<(), SourceError> {
    if path.exists() {
        return Ok(());
    }
    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    nix::unistd::mkfifo(path, mode).map_err(|source| SourceError::CreateFifo {
        path: path.to_path_buf(),
        source,
    })?;
    info!("[ingest] created FIFO {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn frames(input: &[u8]) -> Vec<Frame> {
        FrameSource::new(Cursor::new(input.to_vec())).collect()
    }

    #[test]
    fn test_decodes_lines_in_order() {
        assert_eq!(
            frames(b"10;20;30\n5;x;15\n"),
            vec![vec![10, 20, 30], vec![5, 15]]
        );
    }

    #[test]
    fn test_skips_lines_without_bins() {
        assert_eq!(frames(b";;\nfoo\n\n1;2\n"), vec![vec![1, 2]]);
    }

    #[test]
    fn test_last_line_without_newline() {
        assert_eq!(frames(b"1;2\n3;4"), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_invalid_utf8_is_noise() {
        assert_eq!(frames(b"7;\xff\xfe;8\n"), vec![vec![7, 8]]);
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
            }
            self.served = true;
            let line = b"4;5\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_read_error_ends_sequence() {
        let mut source = FrameSource::new(BufReader::new(FailingReader { served: false }));
        assert_eq!(source.next(), Some(vec![4, 5]));
        assert_eq!(source.next(), None);
        assert_eq!(source.next(), None);
    }

    #[test]
    fn test_pump_honours_stop_flag() {
        let buffer = SharedFrameBuffer::new(0);
        let stop = AtomicBool::new(true);
        let published = pump(FrameSource::new(Cursor::new(b"1\n2\n".to_vec())), &buffer, &stop);
        assert_eq!(published, 0);
        assert_eq!(buffer.sequence(), 0);
    }

    #[test]
    fn test_reader_ingestion_marks_source_closed() {
        let buffer = Arc::new(SharedFrameBuffer::new(2));
        let handle =
            spawn_reader_ingestion(Cursor::new(b"1;2\n3;4\n".to_vec()), Arc::clone(&buffer))
                .unwrap();
        assert_eq!(handle.join().unwrap(), 2);
        assert!(buffer.is_source_closed());
        assert_eq!(buffer.snapshot(), vec![3, 4]);
    }

    #[test]
    fn test_unopenable_fifo_marks_source_closed() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedFrameBuffer::new(2));
        let options = FifoOptions {
            path: dir.path().join("missing.fifo"),
            create: false,
            reopen_on_close: true,
        };
        let handle = spawn_fifo_ingestion(options, Arc::clone(&buffer)).unwrap();
        assert_eq!(handle.join().unwrap(), 0);
        assert!(buffer.is_source_closed());
    }

    #[test]
    fn test_ensure_fifo_creates_pipe_once() {
        use std::os::unix::fs::FileTypeExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cava.fifo");
        ensure_fifo(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().file_type().is_fifo());
        // Second call leaves the existing pipe alone
        ensure_fifo(&path).unwrap();
    }
}
