use alloc::{collections::BTreeMap, vec::Vec};
use core::time::Duration;

use crate::frame::Frame;

/// Persistence for the quiet-room baseline.
///
/// The calibrator only ever stores one ordered run of magnitudes, so the
/// store is a blob at a well-known location: load it once at startup,
/// overwrite it on every committed calibration.
pub trait BaselineStore {
    type Error;

    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(&mut self) -> Result<Option<Frame>, Self::Error>;

    fn save(&mut self, baseline: &[u32]) -> Result<(), Self::Error>;
}

/// What a call to [`BaselineCalibrator::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// No capture in progress.
    Idle,
    /// The frame was recorded; `remaining` is left on the capture window.
    Capturing { remaining: Duration, captured: usize },
    /// The capture window closed and a new baseline was stored.
    Committed {
        bins: usize,
        frames_used: usize,
        frames_dropped: usize,
    },
    /// The capture window closed without a single frame. The previous
    /// baseline is untouched.
    NoData,
}

struct CalibrationSession {
    started_at: Duration,
    captured: Vec<Frame>,
}

/// Records quiet-room frames and subtracts their per-bin mean from live frames.
pub struct BaselineCalibrator<S> {
    store: S,
    baseline: Option<Frame>,
    session: Option<CalibrationSession>,
    capture_duration: Duration,
}

impl<S: BaselineStore> BaselineCalibrator<S> {
    pub fn new(store: S, capture_duration: Duration) -> Self {
        Self {
            store,
            baseline: None,
            session: None,
            capture_duration,
        }
    }

    /// Pulls a previously saved baseline out of the store.
    ///
    /// Returns whether one was found. A missing baseline is not an error,
    /// frames simply pass through [`subtract`](Self::subtract) unfiltered.
    pub fn load_baseline(&mut self) -> Result<bool, S::Error> {
        self.baseline = self.store.load()?.filter(|b| !b.is_empty());
        Ok(self.baseline.is_some())
    }

    /// Opens a capture window starting at `now`.
    ///
    /// Returns `false` and changes nothing when a capture is already running.
    pub fn begin_calibration(&mut self, now: Duration) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(CalibrationSession {
            started_at: now,
            captured: Vec::new(),
        });
        true
    }

    /// Feeds one live frame to the running capture, if any.
    ///
    /// While the window is open the frame is recorded. On the first tick at
    /// or past the capture duration the recorded frames are reduced into the
    /// new baseline, which is saved and the session ends. If saving fails the
    /// new baseline is still used for this run and the store error is
    /// returned; there is no retry.
    pub fn tick(&mut self, frame: &[u32], now: Duration) -> Result<CalibrationStatus, S::Error> {
        let Some(session) = self.session.as_mut() else {
            return Ok(CalibrationStatus::Idle);
        };

        let elapsed = now.saturating_sub(session.started_at);
        if elapsed < self.capture_duration {
            if !frame.is_empty() {
                session.captured.push(frame.to_vec());
            }
            return Ok(CalibrationStatus::Capturing {
                remaining: self.capture_duration - elapsed,
                captured: session.captured.len(),
            });
        }

        let captured = match self.session.take() {
            Some(session) => session.captured,
            None => return Ok(CalibrationStatus::Idle),
        };
        let Some((baseline, frames_used)) = average_frames(&captured) else {
            return Ok(CalibrationStatus::NoData);
        };

        let status = CalibrationStatus::Committed {
            bins: baseline.len(),
            frames_used,
            frames_dropped: captured.len() - frames_used,
        };
        let saved = self.store.save(&baseline);
        self.baseline = Some(baseline);
        saved.map(|_| status)
    }

    /// Removes the baseline from `frame`, flooring every bin at zero.
    ///
    /// Without a baseline, or when the bin counts differ, the frame comes
    /// back unchanged.
    pub fn subtract(&self, frame: &[u32]) -> Frame {
        match &self.baseline {
            Some(baseline) => subtract_baseline(frame, baseline),
            None => frame.to_vec(),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    pub fn baseline(&self) -> Option<&[u32]> {
        self.baseline.as_deref()
    }

    pub fn capture_duration(&self) -> Duration {
        self.capture_duration
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Per-bin `max(frame - baseline, 0)`, or `frame` itself on a length mismatch.
pub fn subtract_baseline(frame: &[u32], baseline: &[u32]) -> Frame {
    if frame.len() != baseline.len() {
        return frame.to_vec();
    }
    frame
        .iter()
        .zip(baseline)
        .map(|(&value, &noise)| value.saturating_sub(noise))
        .collect()
}

/// Integer mean per bin over the frames sharing the most common length.
///
/// Frames of any other length are left out of the reduction. Ties between
/// lengths go to the longer one. Returns the mean and how many frames fed
/// it, or `None` for an empty capture.
pub fn average_frames(frames: &[Frame]) -> Option<(Frame, usize)> {
    let mut length_counts: BTreeMap<usize, usize> = BTreeMap::new();
    for frame in frames.iter().filter(|f| !f.is_empty()) {
        *length_counts.entry(frame.len()).or_insert(0) += 1;
    }

    // BTreeMap iterates ascending, so `max_by_key` keeps the longest on a tie
    let (bins, count) = length_counts.into_iter().max_by_key(|&(_, count)| count)?;

    let mut sums = alloc::vec![0u64; bins];
    for frame in frames.iter().filter(|f| f.len() == bins) {
        for (sum, &value) in sums.iter_mut().zip(frame) {
            *sum += u64::from(value);
        }
    }

    let mean = sums
        .into_iter()
        .map(|sum| (sum / count as u64) as u32)
        .collect();
    Some((mean, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[derive(Default)]
    struct MemoryStore {
        saved: Option<Frame>,
        fail_saves: bool,
        save_calls: usize,
    }

    impl BaselineStore for MemoryStore {
        type Error = &'static str;

        fn load(&mut self) -> Result<Option<Frame>, Self::Error> {
            Ok(self.saved.clone())
        }

        fn save(&mut self, baseline: &[u32]) -> Result<(), Self::Error> {
            self.save_calls += 1;
            if self.fail_saves {
                return Err("disk full");
            }
            self.saved = Some(baseline.to_vec());
            Ok(())
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn calibrator() -> BaselineCalibrator<MemoryStore> {
        BaselineCalibrator::new(MemoryStore::default(), secs(10))
    }

    #[test]
    fn test_capture_of_identical_frames() {
        let mut cal = calibrator();
        assert!(cal.begin_calibration(secs(0)));

        for t in [1, 2, 3] {
            let status = cal.tick(&[10, 20], secs(t)).unwrap();
            assert_eq!(
                status,
                CalibrationStatus::Capturing {
                    remaining: secs(10 - t),
                    captured: t as usize,
                }
            );
        }

        let status = cal.tick(&[99, 99], secs(10)).unwrap();
        assert_eq!(
            status,
            CalibrationStatus::Committed {
                bins: 2,
                frames_used: 3,
                frames_dropped: 0,
            }
        );
        assert_eq!(cal.baseline(), Some(&[10, 20][..]));
        assert_eq!(cal.store().saved, Some(vec![10, 20]));
        assert!(!cal.is_capturing());
    }

    #[test]
    fn test_mean_is_truncated() {
        let mut cal = calibrator();
        cal.begin_calibration(secs(0));
        cal.tick(&[1, 10], secs(1)).unwrap();
        cal.tick(&[2, 11], secs(2)).unwrap();
        cal.tick(&[10, 20], secs(11)).unwrap();
        assert_eq!(cal.baseline(), Some(&[1, 10][..]));
    }

    #[test]
    fn test_empty_capture_keeps_previous_baseline() {
        let mut cal = calibrator();
        cal.begin_calibration(secs(0));
        let status = cal.tick(&[5, 5], secs(10)).unwrap();
        assert_eq!(status, CalibrationStatus::NoData);
        assert_eq!(cal.baseline(), None);
        assert_eq!(cal.store().save_calls, 0);
        assert!(!cal.is_capturing());
    }

    #[test]
    fn test_begin_is_ignored_while_capturing() {
        let mut cal = calibrator();
        assert!(cal.begin_calibration(secs(0)));
        cal.tick(&[4], secs(5)).unwrap();
        assert!(!cal.begin_calibration(secs(5)));

        // Still closes on the first session's clock
        let status = cal.tick(&[4], secs(10)).unwrap();
        assert!(matches!(status, CalibrationStatus::Committed { .. }));
    }

    #[test]
    fn test_majority_length_wins() {
        let frames = vec![vec![10, 10, 10], vec![2, 4], vec![4, 8], vec![6, 0]];
        let (mean, used) = average_frames(&frames).unwrap();
        assert_eq!(mean, vec![4, 4]);
        assert_eq!(used, 3);
    }

    #[test]
    fn test_majority_tie_prefers_longer_frames() {
        let frames = vec![vec![1, 1], vec![3, 3, 3]];
        let (mean, used) = average_frames(&frames).unwrap();
        assert_eq!(mean, vec![3, 3, 3]);
        assert_eq!(used, 1);
    }

    #[test]
    fn test_subtract_floors_at_zero() {
        assert_eq!(subtract_baseline(&[10, 5, 7], &[3, 9, 7]), vec![7, 0, 0]);
    }

    #[test]
    fn test_subtract_ignores_mismatched_baseline() {
        assert_eq!(subtract_baseline(&[10, 5, 7], &[1, 1]), vec![10, 5, 7]);

        let mut cal = calibrator();
        cal.store.saved = Some(vec![1, 1]);
        assert!(cal.load_baseline().unwrap());
        assert_eq!(cal.subtract(&[3, 3]), vec![2, 2]);
        assert_eq!(cal.subtract(&[3, 3, 3]), vec![3, 3, 3]);
    }

    #[test]
    fn test_missing_baseline_passes_frames_through() {
        let mut cal = calibrator();
        assert!(!cal.load_baseline().unwrap());
        assert_eq!(cal.subtract(&[8, 9]), vec![8, 9]);
    }

    #[test]
    fn test_failed_save_still_applies_baseline() {
        let mut cal = BaselineCalibrator::new(
            MemoryStore {
                fail_saves: true,
                ..MemoryStore::default()
            },
            secs(10),
        );
        cal.begin_calibration(secs(0));
        cal.tick(&[2, 2], secs(1)).unwrap();
        assert_eq!(cal.tick(&[2, 2], secs(12)), Err("disk full"));
        assert_eq!(cal.baseline(), Some(&[2, 2][..]));
        assert!(!cal.is_capturing());
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let mut cal = calibrator();
        assert_eq!(cal.tick(&[1, 2], secs(3)).unwrap(), CalibrationStatus::Idle);
    }
}
