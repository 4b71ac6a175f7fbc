use cava_viz::{ColorMode, DisplayMode, ScalingStrategy, Sensitivity};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Number keys `1`..`9` are the only mode selectors.
pub const MAX_MODES: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalingSetting {
    #[default]
    Sensitivity,
    Dynamic,
}

impl From<ScalingSetting> for ScalingStrategy {
    fn from(setting: ScalingSetting) -> Self {
        match setting {
            ScalingSetting::Sensitivity => ScalingStrategy::SensitivityMultiplier,
            ScalingSetting::Dynamic => ScalingStrategy::DynamicMax,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaveColorSetting {
    #[default]
    Static,
    Spectrum,
    Gradient,
    Shifting,
}

impl From<WaveColorSetting> for ColorMode {
    fn from(setting: WaveColorSetting) -> Self {
        match setting {
            WaveColorSetting::Static => ColorMode::Static,
            WaveColorSetting::Spectrum => ColorMode::Spectrum,
            WaveColorSetting::Gradient => ColorMode::Gradient,
            WaveColorSetting::Shifting => ColorMode::ShiftingSpectrum,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivitySettings {
    pub initial: f32,
    pub step: f32,
    pub min: f32,
    pub max: f32,
}

impl Default for SensitivitySettings {
    fn default() -> Self {
        Self {
            initial: 1.0,
            step: 0.1,
            min: 0.1,
            max: 5.0,
        }
    }
}

impl SensitivitySettings {
    pub fn to_sensitivity(&self) -> Sensitivity {
        Sensitivity::new(self.initial, self.step, self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub fifo_path: PathBuf,
    pub create_fifo: bool,
    pub reopen_on_close: bool,
    pub baseline_path: PathBuf,
    pub backgrounds_dir: PathBuf,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Defaults to half the screen height.
    pub max_height: Option<u32>,
    pub initial_bins: usize,
    pub trim_high_bins: usize,
    pub ticks_per_second: u32,
    pub capture_duration_secs: f32,
    pub switch_timeout_secs: f32,
    pub stale_after_secs: f32,
    pub scaling: ScalingSetting,
    pub sensitivity: SensitivitySettings,
    pub primary_mode: u8,
    /// `None` makes every non-primary mode revert.
    pub auto_revertible: Option<Vec<u8>>,
    pub stroke_width: u32,
    pub wave_color: WaveColorSetting,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fifo_path: PathBuf::from("/tmp/cava.fifo"),
            create_fifo: true,
            reopen_on_close: false,
            baseline_path: PathBuf::from("baseline.json"),
            backgrounds_dir: PathBuf::from("backgrounds"),
            screen_width: 800,
            screen_height: 400,
            max_height: None,
            initial_bins: 256,
            trim_high_bins: 0,
            ticks_per_second: 60,
            capture_duration_secs: 10.0,
            switch_timeout_secs: 20.0,
            stale_after_secs: 2.0,
            scaling: ScalingSetting::default(),
            sensitivity: SensitivitySettings::default(),
            primary_mode: 0,
            auto_revertible: None,
            stroke_width: 2,
            wave_color: WaveColorSetting::default(),
        }
    }
}

impl OverlayConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!("[config] {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                field,
                reason: reason.into(),
            })
        }

        if self.screen_width == 0 || self.screen_height == 0 {
            return invalid("screen_width/screen_height", "screen must not be empty");
        }
        if self.max_height() < 2 {
            return invalid("max_height", "must be at least 2");
        }
        // Half the waveform goes each way from the centre line
        let limit = (2 * i64::from(self.center_y()) - 1).max(0);
        if i64::from(self.max_height()) > limit {
            return invalid(
                "max_height",
                format!(
                    "{} does not fit a {} px tall screen, at most {limit}",
                    self.max_height(),
                    self.screen_height
                ),
            );
        }
        if self.ticks_per_second == 0 {
            return invalid("ticks_per_second", "must be positive");
        }
        for (field, secs) in [
            ("capture_duration_secs", self.capture_duration_secs),
            ("switch_timeout_secs", self.switch_timeout_secs),
            ("stale_after_secs", self.stale_after_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                return invalid(field, format!("must be a positive number of seconds, got {secs}"));
            }
            if Duration::try_from_secs_f32(secs).is_err() {
                return invalid(field, format!("{secs} seconds is out of range"));
            }
        }

        let s = &self.sensitivity;
        if !(s.min > 0.0 && s.min <= s.max && s.step > 0.0) {
            return invalid(
                "sensitivity",
                format!("need 0 < min <= max and step > 0, got {s:?}"),
            );
        }
        if usize::from(self.primary_mode) >= MAX_MODES {
            return invalid("primary_mode", format!("must be below {MAX_MODES}"));
        }
        Ok(())
    }

    pub fn max_height(&self) -> u32 {
        self.max_height.unwrap_or(self.screen_height / 2)
    }

    pub fn center_y(&self) -> i32 {
        (self.screen_height / 2) as i32
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.ticks_per_second.max(1)))
    }

    pub fn capture_duration(&self) -> Duration {
        seconds(self.capture_duration_secs)
    }

    pub fn switch_timeout(&self) -> Duration {
        seconds(self.switch_timeout_secs)
    }

    pub fn stale_after(&self) -> Duration {
        seconds(self.stale_after_secs)
    }

    pub fn primary(&self) -> DisplayMode {
        DisplayMode(self.primary_mode)
    }

    pub fn auto_revertible_modes(&self) -> Option<Vec<DisplayMode>> {
        self.auto_revertible
            .as_ref()
            .map(|modes| modes.iter().copied().map(DisplayMode).collect())
    }
}

/// Out-of-range values saturate; `validate` rejects them up front.
fn seconds(secs: f32) -> Duration {
    match Duration::try_from_secs_f32(secs) {
        Ok(duration) => duration,
        Err(_) if secs > 0.0 => Duration::MAX,
        Err(_) => Duration::ZERO,
    }
}
