use alloc::vec::Vec;

use embedded_graphics::geometry::Point;

/// Two mirrored polylines, ordered left to right, one point per bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub upper: Vec<Point>,
    pub lower: Vec<Point>,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.upper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upper.is_empty()
    }
}

/// Turns a scaled frame into the upper and lower outline of the wave.
///
/// Bins are spread evenly over `width` so the first bin sits on `x = 0` and
/// the last on `x = width`. A bin of height `v` rises `v / 2` above
/// `center_y`; the lower curve is the upper one reflected through
/// `center_y`.
pub struct WaveformGenerator {
    width: u32,
    center_y: i32,
}

impl WaveformGenerator {
    pub fn new(width: u32, center_y: i32) -> Self {
        Self { width, center_y }
    }

    /// Builds both polylines, or `None` for fewer than two bins.
    pub fn generate(&self, scaled: &[u32]) -> Option<Waveform> {
        let n = scaled.len();
        if n < 2 {
            return None;
        }

        let last = (n - 1) as i64;
        let width = i64::from(self.width);

        let upper: Vec<Point> = scaled
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let x = (i as i64 * width / last) as i32;
                let half = (v / 2).min(i32::MAX as u32) as i32;
                Point::new(x, self.center_y.saturating_sub(half))
            })
            .collect();

        let lower = upper
            .iter()
            .map(|p| Point::new(p.x, self.reflect(p.y)))
            .collect();

        Some(Waveform { upper, lower })
    }

    fn reflect(&self, y: i32) -> i32 {
        2 * self.center_y - y
    }

    pub fn center_y(&self) -> i32 {
        self.center_y
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}
