use std::cmp::Ordering;

/// Numeric `(major, minor, patch)` of a version string. Missing or
/// non-numeric components count as 0, so `1.x` reads as `(1, 0, 0)`.
pub fn components(version: &str) -> (u64, u64, u64) {
    let version = version.strip_prefix('v').unwrap_or(version);
    let mut parts = version
        .split('.')
        .map(|p| p.parse::<u64>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

pub fn compare(a: &str, b: &str) -> Ordering {
    components(a).cmp(&components(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_not_lexical() {
        assert_eq!(compare("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare("2.0.0", "10.0.0"), Ordering::Less);
    }

    #[test]
    fn missing_and_garbage_components_are_zero() {
        assert_eq!(components("1"), (1, 0, 0));
        assert_eq!(components("1.x.3"), (1, 0, 3));
        assert_eq!(components("v2.1"), (2, 1, 0));
        assert_eq!(components(""), (0, 0, 0));
        assert_eq!(compare("1.0", "1.0.0"), Ordering::Equal);
    }
}
