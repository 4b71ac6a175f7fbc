use alloc::vec::Vec;

/// Separator between bin magnitudes on one analyzer output line.
pub const FRAME_DELIMITER: char = ';';

/// One spectrum snapshot: a magnitude per frequency bin.
///
/// The bin count is whatever the analyzer sends and may change between
/// frames, so nothing downstream assumes a fixed length.
pub type Frame = Vec<u32>;

/// Decodes one analyzer line (`"10;20;30"`) into a frame.
///
/// Tokens that are not base-10 non-negative integers are dropped and the
/// rest of the line is kept. Returns `None` when no token survives, so an
/// empty frame is never produced.
pub fn parse_frame_line(line: &str) -> Option<Frame> {
    let frame: Frame = line
        .trim()
        .split(FRAME_DELIMITER)
        .filter_map(parse_bin)
        .collect();

    if frame.is_empty() {
        None
    } else {
        Some(frame)
    }
}

fn parse_bin(token: &str) -> Option<u32> {
    let token = token.trim();
    // `u32::from_str` accepts a leading '+', the analyzer never sends one.
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Drops `count` bins from the high end of `frame`.
pub fn trim_high_bins(frame: &mut Frame, count: usize) {
    let keep = frame.len().saturating_sub(count);
    frame.truncate(keep);
}
