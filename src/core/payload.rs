//! Inbound payload parsing.
//!
//! Malformed payloads never surface as errors: touch falls back to an
//! all-released reading, proximity and sleep yield `None` and are ignored.

use serde::{Deserialize, Serialize};

/// One reading from the two head touch pads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchReading {
    pub left: bool,
    pub right: bool,
}

impl TouchReading {
    /// Build a reading from the two pad states.
    pub fn new(left: bool, right: bool) -> Self {
        Self { left, right }
    }

    /// True while at least one pad reads active.
    pub fn is_active(&self) -> bool {
        self.left || self.right
    }
}

/// Parse a touch payload such as `touch: L_HEAD=1, R_HEAD=0`.
///
/// This is the lenient entry point: an unreadable payload reads as both pads
/// released, which is how the engine treats it. Use [`try_parse_touch`] to
/// tell the two cases apart.
pub fn parse_touch(payload: &str) -> TouchReading {
    try_parse_touch(payload).unwrap_or_default()
}

/// Like [`parse_touch`], but `None` when any field has a non-integer value.
pub fn try_parse_touch(payload: &str) -> Option<TouchReading> {
    let body = strip_prefix_ci(payload.trim(), "touch:").trim();

    let mut reading = TouchReading::default();
    for part in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().parse::<i64>().ok()?;
        match key.trim() {
            "L_HEAD" => reading.left = value == 1,
            "R_HEAD" => reading.right = value == 1,
            _ => {}
        }
    }
    Some(reading)
}

/// Parse a proximity payload such as `radar:1`. Only `1` counts as detected.
pub fn parse_proximity(payload: &str) -> Option<bool> {
    let body = strip_prefix_ci(payload.trim(), "radar:").trim();
    body.parse::<i64>().ok().map(|value| value == 1)
}

/// Parse a sleep payload such as `sleep:1`. Values other than `0`/`1` are rejected.
pub fn parse_sleep(payload: &str) -> Option<bool> {
    match strip_prefix_ci(payload.trim(), "sleep:").trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_plain_and_prefixed() {
        assert_eq!(parse_touch("L_HEAD=1,R_HEAD=0"), TouchReading::new(true, false));
        assert_eq!(parse_touch("touch: L_HEAD=0, R_HEAD=1"), TouchReading::new(false, true));
        assert_eq!(parse_touch("TOUCH:R_HEAD=1"), TouchReading::new(false, true));
    }

    #[test]
    fn test_touch_ignores_unknown_keys_and_bare_parts() {
        let reading = parse_touch("L_HEAD=1,CHIN=1,garbage,,");
        assert_eq!(reading, TouchReading::new(true, false));
    }

    #[test]
    fn test_touch_malformed_reads_released() {
        assert_eq!(parse_touch("L_HEAD=yes,R_HEAD=1"), TouchReading::default());
        assert_eq!(parse_touch(""), TouchReading::default());
        assert!(!parse_touch("nonsense").is_active());
        assert_eq!(try_parse_touch("L_HEAD=1,R_HEAD=?"), None);
        assert_eq!(try_parse_touch(""), Some(TouchReading::default()));
    }

    #[test]
    fn test_touch_non_one_values_are_inactive() {
        assert_eq!(parse_touch("L_HEAD=2,R_HEAD=0"), TouchReading::default());
    }

    #[test]
    fn test_proximity() {
        assert_eq!(parse_proximity("1"), Some(true));
        assert_eq!(parse_proximity(" radar: 0 "), Some(false));
        assert_eq!(parse_proximity("Radar:1"), Some(true));
        assert_eq!(parse_proximity("7"), Some(false));
        assert_eq!(parse_proximity("on"), None);
        assert_eq!(parse_proximity(""), None);
    }

    #[test]
    fn test_sleep() {
        assert_eq!(parse_sleep("1"), Some(true));
        assert_eq!(parse_sleep("sleep:0"), Some(false));
        assert_eq!(parse_sleep("SLEEP: 1"), Some(true));
        assert_eq!(parse_sleep("2"), None);
        assert_eq!(parse_sleep("true"), None);
    }
}
