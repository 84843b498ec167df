#![forbid(unsafe_code)]

//! Compact relative timestamps for the card's byline.

use web_time::{Duration, SystemTime};

const NOW: u64 = 5;
const MINUTE: u64 = 60;
const HOUR: u64 = MINUTE * 60;
const DAY: u64 = HOUR * 24;
const MONTH: u64 = DAY * 30;

/// Relative age of a timestamp, in the card's shorthand: `now`, then
/// `12s`, `4m`, `2h`, `3d`, `5mo`.
///
/// Timestamps in the future (clock skew between feed indexer and device)
/// render as `now`.
#[must_use]
pub fn ago(when: SystemTime) -> String {
    ago_at(when, SystemTime::now())
}

fn ago_at(when: SystemTime, now: SystemTime) -> String {
    let elapsed = now
        .duration_since(when)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    match elapsed {
        0..NOW => "now".to_owned(),
        NOW..MINUTE => format!("{elapsed}s"),
        MINUTE..HOUR => format!("{}m", elapsed / MINUTE),
        HOUR..DAY => format!("{}h", elapsed / HOUR),
        DAY..MONTH => format!("{}d", elapsed / DAY),
        _ => format!("{}mo", elapsed / MONTH),
    }
}
