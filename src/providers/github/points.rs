use regex::Regex;
use std::sync::OnceLock;

/// One or two digits followed by "Point", e.g. "3 Point", "10 Points" or "Size: 5 Points".
const POINTS_LABEL: &str = r"\b(\d{1,2})\s*Point";

fn points_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(POINTS_LABEL).ok()).as_ref()
}

/// Points encoded in a single label name, if it is a points label.
pub fn label_points(name: &str) -> Option<u32> {
    points_pattern()?
        .captures(name)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Sum of all points labels on an issue. Other labels count as zero.
pub fn total_points(labels: Option<&[String]>) -> u32 {
    labels
        .unwrap_or_default()
        .iter()
        .filter_map(|name| label_points(name))
        .sum()
}
