use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;

/// Which background is on screen. Mode `n` shows background `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayMode(pub u8);

impl DisplayMode {
    pub fn background_index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode {}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct ModeTimer {
    entered_at: Duration,
}

/// Chooses the active mode.
///
/// Starts in the primary mode, the only one that draws the waveform.
/// The operator can switch to any valid mode at any time; modes in the
/// auto-revertible set fall back to primary once they have been shown for
/// longer than the switch timeout.
pub struct DisplayModeController {
    mode_count: u8,
    primary: DisplayMode,
    auto_revertible: Vec<DisplayMode>,
    switch_timeout: Duration,
    current: DisplayMode,
    timer: ModeTimer,
}

impl DisplayModeController {
    /// `auto_revertible` of `None` makes every non-primary mode revert.
    pub fn new(
        mode_count: u8,
        primary: DisplayMode,
        auto_revertible: Option<Vec<DisplayMode>>,
        switch_timeout: Duration,
    ) -> Self {
        let auto_revertible = match auto_revertible {
            Some(modes) => modes
                .into_iter()
                .filter(|&m| m != primary && m.0 < mode_count)
                .collect(),
            None => (0..mode_count)
                .map(DisplayMode)
                .filter(|&m| m != primary)
                .collect(),
        };

        Self {
            mode_count,
            primary,
            auto_revertible,
            switch_timeout,
            current: primary,
            timer: ModeTimer {
                entered_at: Duration::ZERO,
            },
        }
    }

    pub fn is_valid(&self, mode: DisplayMode) -> bool {
        mode.0 < self.mode_count
    }

    /// Switches to `mode` and restarts its timer, even if it is already
    /// active. Returns `false` for a mode outside the configured range.
    pub fn select_mode(&mut self, mode: DisplayMode, now: Duration) -> bool {
        if !self.is_valid(mode) {
            return false;
        }
        self.enter(mode, now);
        true
    }

    /// Reverts to primary once an auto-revertible mode has outstayed the
    /// timeout. Returns the mode that was left, if a revert happened.
    pub fn tick(&mut self, now: Duration) -> Option<DisplayMode> {
        if !self.is_auto_revertible(self.current) {
            return None;
        }
        if now.saturating_sub(self.timer.entered_at) <= self.switch_timeout {
            return None;
        }
        let left = self.current;
        self.enter(self.primary, now);
        Some(left)
    }

    fn enter(&mut self, mode: DisplayMode, now: Duration) {
        self.current = mode;
        self.timer = ModeTimer { entered_at: now };
    }

    pub fn is_auto_revertible(&self, mode: DisplayMode) -> bool {
        self.auto_revertible.contains(&mode)
    }

    pub fn current(&self) -> DisplayMode {
        self.current
    }

    pub fn is_primary(&self) -> bool {
        self.current == self.primary
    }

    pub fn primary(&self) -> DisplayMode {
        self.primary
    }

    pub fn mode_count(&self) -> u8 {
        self.mode_count
    }
}
