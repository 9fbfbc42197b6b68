//! Title → slug derivation.

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 50;

/// Derive a filesystem- and URL-safe identifier from a game title.
///
/// Whitespace runs become a single hyphen, letters are lowercased, and any
/// character outside `[a-z0-9-]` is dropped. The result is cut to
/// [`MAX_SLUG_LEN`] without a trailing hyphen. Distinct titles may map to the
/// same slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut pending_hyphen = false;

    for ch in title.trim().chars() {
        if ch.is_whitespace() {
            pending_hyphen = true;
            continue;
        }
        let lowered = ch.to_ascii_lowercase();
        if !(lowered.is_ascii_lowercase() || lowered.is_ascii_digit() || lowered == '-') {
            continue;
        }
        if pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        pending_hyphen = false;
        slug.push(lowered);
    }

    slug.truncate(MAX_SLUG_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_lowercases() {
        assert_eq!(slugify("Traffic Rush 3D!"), "traffic-rush-3d");
        assert_eq!(slugify("Traffic Rush 3D!"), slugify("Traffic Rush 3D!"));
        assert_eq!(slugify("  Car: Parking / Jam?  "), "car-parking-jam");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(slugify("Bus \t\n  Driver"), "bus-driver");
        assert_eq!(slugify("Pre-Built Roads"), "pre-built-roads");
    }

    #[test]
    fn respects_length_bound() {
        let title = "Extremely Long Traffic Simulator ".repeat(10);
        let slug = slugify(&title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("extremely-long-traffic-simulator-extremely"));
    }

    #[test]
    fn distinct_titles_can_collide() {
        assert_eq!(slugify("Jam!"), slugify("Jam?"));
    }
}
