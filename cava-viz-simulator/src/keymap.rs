use cava_viz::{Command, DisplayMode};

/// Maps an SDL key name to an overlay command.
///
/// Keys `1`..`9` pick modes 0..8; the controller rejects modes that have
/// no background behind them.
pub fn command_for_key(name: &str) -> Option<Command> {
    let name = name.strip_prefix("Keypad ").unwrap_or(name);

    match name {
        "Up" | "=" | "+" => Some(Command::IncreaseSensitivity),
        "Down" | "-" => Some(Command::DecreaseSensitivity),
        "R" => Some(Command::BeginCalibration),
        "Q" | "Escape" => Some(Command::Quit),
        _ => select_key(name),
    }
}

fn select_key(name: &str) -> Option<Command> {
    let digit = match name.as_bytes() {
        [d @ b'1'..=b'9'] => d - b'1',
        _ => return None,
    };
    Some(Command::SelectMode(DisplayMode(digit)))
}
