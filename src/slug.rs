/// Derives the URL-safe identifier for a movie from its title and release year.
///
/// Anything that is not an ASCII letter, digit or space is dropped, the rest is
/// lowercased and trimmed, and inner spaces become hyphens. An empty title still
/// yields the `-{year}` suffix.
///
/// Hyphens and underscores in the title are dropped too, so `Spider-Man` gives
/// `spiderman`, not `spider-man`.
pub fn derive(title: &str, year_of_release: i32) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .to_ascii_lowercase();

    format!("{}-{year_of_release}", kept.trim().replace(' ', "-"))
}

/// True when the title contributes nothing to the slug.
pub fn is_degenerate(slug: &str, year_of_release: i32) -> bool {
    slug == format!("-{year_of_release}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_lowercase_hyphenated_slug() {
        assert_eq!(derive("The Matrix", 1999), "the-matrix-1999");
        assert_eq!(derive("The Matrix", 1999), derive("The Matrix", 1999));
    }

    #[test]
    fn strips_punctuation_and_outer_whitespace() {
        assert_eq!(derive("  Spider-Man: No Way Home! ", 2021), "spiderman-no-way-home-2021");
        assert_eq!(derive("Amélie", 2001), "amlie-2001");
    }

    #[test]
    fn keeps_repeated_inner_spaces_as_hyphens() {
        assert_eq!(derive("Up  Up", 2009), "up--up-2009");
    }

    #[test]
    fn empty_title_still_carries_year() {
        assert_eq!(derive("", 2020), "-2020");
        assert!(is_degenerate(&derive("?!", 2020), 2020));
        assert!(!is_degenerate(&derive("Heat", 1995), 1995));
    }
}
