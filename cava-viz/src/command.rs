use crate::display_mode::DisplayMode;

/// Operator input, already decoded from whatever device produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectMode(DisplayMode),
    IncreaseSensitivity,
    DecreaseSensitivity,
    BeginCalibration,
    Quit,
}
