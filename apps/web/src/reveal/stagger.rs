use std::time::Duration;

use super::RevealOptions;

/// Delay written onto the `index`-th target when the page author set none.
pub fn auto_delay_ms(index: usize, options: &RevealOptions) -> u64 {
    options.initial_offset_ms + index as u64 * options.step_ms
}

/// Parses a delay attribute the way `parseInt(value, 10)` does: leading
/// whitespace, optional sign, leading digits, trailing garbage ignored.
/// Negative delays clamp to zero. `None` when no digits lead the value.
pub fn parse_delay_ms(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if negative {
        return Some(0);
    }
    // Saturate absurd values instead of failing.
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Per-element delay at intersection time.
pub fn element_delay_ms(attribute: Option<&str>, options: &RevealOptions) -> u64 {
    attribute
        .and_then(parse_delay_ms)
        .unwrap_or(options.default_delay_ms)
}

/// Extra delay for elements further down the viewport, so stacked elements cascade.
pub fn positional_stagger(bounding_top: f64, options: &RevealOptions) -> Duration {
    if options.stagger_step_px <= 0.0 || !bounding_top.is_finite() {
        return Duration::ZERO;
    }
    let steps = (bounding_top / options.stagger_step_px)
        .round()
        .clamp(0.0, f64::from(options.max_stagger_steps));
    Duration::from_millis(steps as u64 * options.stagger_ms)
}

/// Delay from the intersection event to adding the visible class.
pub fn total_delay(attribute: Option<&str>, bounding_top: f64, options: &RevealOptions) -> Duration {
    Duration::from_millis(element_delay_ms(attribute, options))
        + positional_stagger(bounding_top, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_delay_staggers_by_index() {
        let options = RevealOptions::default();
        assert_eq!(auto_delay_ms(0, &options), 90);
        assert_eq!(auto_delay_ms(4, &options), 190);
    }

    #[test]
    fn test_parse_delay_follows_parse_int() {
        assert_eq!(parse_delay_ms("250"), Some(250));
        assert_eq!(parse_delay_ms("  120ms"), Some(120));
        assert_eq!(parse_delay_ms("+40"), Some(40));
        assert_eq!(parse_delay_ms("-15"), Some(0));
        assert_eq!(parse_delay_ms("fast"), None);
        assert_eq!(parse_delay_ms(""), None);
    }

    #[test]
    fn test_element_delay_falls_back_to_default() {
        let options = RevealOptions::default();
        assert_eq!(element_delay_ms(Some("300"), &options), 300);
        assert_eq!(element_delay_ms(Some("soon"), &options), 100);
        assert_eq!(element_delay_ms(None, &options), 100);
    }

    #[test]
    fn test_positional_stagger_is_clamped() {
        let options = RevealOptions::default();
        assert_eq!(positional_stagger(-250.0, &options), Duration::ZERO);
        assert_eq!(positional_stagger(0.0, &options), Duration::ZERO);
        assert_eq!(positional_stagger(149.0, &options), Duration::from_millis(30));
        assert_eq!(positional_stagger(150.0, &options), Duration::from_millis(60));
        assert_eq!(positional_stagger(420.0, &options), Duration::from_millis(120));
        assert_eq!(positional_stagger(5000.0, &options), Duration::from_millis(180));
    }

    #[test]
    fn test_total_delay_combines_both_parts() {
        let options = RevealOptions::default();
        assert_eq!(total_delay(Some("115"), 310.0, &options), Duration::from_millis(205));
    }
}
