//! Progress extraction from chdman output lines.

use regex::Regex;
use std::sync::OnceLock;

fn percent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{1,3})%").expect("static pattern is valid"))
}

/// Find the first `N%` (one to three digits) in `line` and return it clamped
/// to 100. Lines without a match yield `None`.
pub fn parse_progress(line: &str) -> Option<u8> {
    let caps = percent_pattern().captures(line)?;
    let value: u32 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_percentage() {
        assert_eq!(parse_progress("Compressing... 42% done"), Some(42));
        assert_eq!(parse_progress("0%"), Some(0));
    }

    #[test]
    fn no_match() {
        assert_eq!(parse_progress("no percent here"), None);
        assert_eq!(parse_progress("%"), None);
        assert_eq!(parse_progress(""), None);
        assert_eq!(parse_progress("42 %"), None);
    }

    #[test]
    fn clamps_overflow() {
        assert_eq!(parse_progress("150% overflow"), Some(100));
        assert_eq!(parse_progress("999%"), Some(100));
    }

    #[test]
    fn digit_group_capped_at_three() {
        // Leftmost match is the last three digits before the sign.
        assert_eq!(parse_progress("1234%"), Some(100));
        assert_eq!(parse_progress("1050%"), Some(50));
    }

    #[test]
    fn first_occurrence_wins() {
        assert_eq!(parse_progress("10% then 90%"), Some(10));
    }

    #[test]
    fn binary_garbage_does_not_panic() {
        let garbage = String::from_utf8_lossy(&[0xff, 0x00, 0x25, 0x39, 0x39, 0x25, 0xfe]);
        assert_eq!(parse_progress(&garbage), Some(99));
    }
}
