//! Track identity normalization.
//!
//! Turns display strings from any source into comparison keys. Each
//! platform has its own naming habits ("(Radio Edit)", "- Remastered 2011",
//! "The Beatles" vs "Beatles", accented vs plain letters); the key is what
//! remains once those are folded away.
//!
//! The functions here are pure: same input, same key, no locale lookups.
//! Applying them to their own output is a no-op.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracks::Track;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Bracket groups carrying a version/credit qualifier: "(feat. X)", "[Remix]",
/// "{Live at Wembley}", "(2011 Remaster)", "(Radio Edit)".
static QUALIFIER_BRACKETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*[(\[{][^)\]}]*\b(?:feat|ft|featuring|with|remix|remixed|rmx|mix|remaster|remastered|live|edit|version|radio|acoustic|mono|stereo|demo|bonus|deluxe|instrumental|extended|explicit|clean|prod)\b[^)\]}]*[)\]}]",
    )
    .unwrap()
});

/// A trailing " - qualifier" segment: "- Remastered 2011", "- Live", "- 1997".
/// Needs spaces around the dash so hyphenated names ("Jay-Z") survive.
/// Runs after ASCII folding, so en and em dashes arrive as '-'.
static TRAILING_DASH_QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s+-+\s+(?:[^-]*\b(?:remaster|remastered|live|edit|version|mix|remix|mono|stereo|acoustic|demo|bonus|instrumental|recorded|feat|ft|featuring)\b[^-]*|\d{4})\s*$",
    )
    .unwrap()
});

/// Any bracket group, used for artists ("Artist (UK)")
static ANY_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[(\[{][^)\]}]*[)\]}]").unwrap());

/// Unbracketed featured artist at the end, after punctuation cleanup
static TRAILING_FEATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(?:feat|ft|featuring)\s.*$").unwrap());

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// KEY TYPE
// ============================================================================

/// Canonical (artist, title) pair used for comparison.
///
/// Distinct from the display strings on `Track`; derived, never stored back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedKey {
    pub artist_key: String,
    pub title_key: String,
}

impl NormalizedKey {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist_key: normalize_artist(artist),
            title_key: normalize_title(title),
        }
    }

    pub fn from_track(track: &Track) -> Self {
        Self::new(track.artist(), track.title())
    }

    /// True when either side lost all its signal during normalization
    pub fn is_empty(&self) -> bool {
        self.artist_key.is_empty() || self.title_key.is_empty()
    }
}

/// Derive the comparison key for a track.
pub fn normalize(track: &Track) -> NormalizedKey {
    NormalizedKey::from_track(track)
}

// ============================================================================
// FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII: NFKD decomposition, drop combining
/// marks, transliterate whatever is left.
/// e.g., "Beyoncé" → "beyonce", "Motörhead" → "motorhead"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Replace punctuation with spaces, drop apostrophes, spell out "&",
/// then collapse whitespace. Input must already be ASCII.
fn strip_punctuation(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\'' | '`' => {}
            '&' => out.push_str(" and "),
            c if c.is_ascii_alphanumeric() => out.push(c),
            _ => out.push(' '),
        }
    }
    collapse_whitespace(&out)
}

fn collapse_whitespace(s: &str) -> String {
    MULTI_SPACE.replace_all(s, " ").trim().to_string()
}

/// Normalize an artist name for matching.
///
/// Steps: ASCII fold → drop bracket groups → strip punctuation →
/// remove leading "the " (repeatedly, so the result is stable).
pub fn normalize_artist(artist: &str) -> String {
    let folded = fold_to_ascii(artist);
    let unbracketed = ANY_BRACKETS.replace_all(&folded, " ");
    let mut normalized = strip_punctuation(&unbracketed);

    while let Some(rest) = normalized.strip_prefix("the ") {
        normalized = rest.to_string();
    }

    normalized
}

/// Normalize a track title for matching.
///
/// Steps: ASCII fold → drop qualifier bracket groups → drop trailing dash
/// qualifiers → strip punctuation → drop an unbracketed "feat ..." tail.
/// A leading "the" is kept: it is part of the title.
pub fn normalize_title(title: &str) -> String {
    let folded = fold_to_ascii(title);
    let mut result = QUALIFIER_BRACKETS.replace_all(&folded, " ").to_string();

    // "Song - Live - 2011 Remaster" carries two qualifiers
    loop {
        let stripped = TRAILING_DASH_QUALIFIER.replace(&result, "").to_string();
        if stripped == result {
            break;
        }
        result = stripped;
    }

    let cleaned = strip_punctuation(&result);
    collapse_whitespace(&TRAILING_FEATURE.replace(&cleaned, ""))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tracks::Platform;

    #[test]
    fn test_fold_to_ascii() {
        assert_eq!(fold_to_ascii("Björk"), "bjork");
        assert_eq!(fold_to_ascii("Motörhead"), "motorhead");
        assert_eq!(fold_to_ascii("Beyoncé"), "beyonce");
        assert_eq!(fold_to_ascii("Sigur Rós"), "sigur ros");
    }

    #[test]
    fn test_normalize_artist() {
        assert_eq!(normalize_artist("The Beatles"), "beatles");
        assert_eq!(normalize_artist("Beatles"), "beatles");
        assert_eq!(normalize_artist("  DAFT   PUNK "), "daft punk");
        assert_eq!(normalize_artist("Simon & Garfunkel"), "simon and garfunkel");
        assert_eq!(normalize_artist("Guns N' Roses"), "guns n roses");
        assert_eq!(normalize_artist("AC/DC"), "ac dc");
        assert_eq!(normalize_artist("Artist (UK)"), "artist");
        // "The" alone is a name, not an article
        assert_eq!(normalize_artist("The The"), "the");
        assert_eq!(normalize_artist("The"), "the");
    }

    #[test]
    fn test_normalize_title_brackets() {
        assert_eq!(normalize_title("One More Time (Radio Edit)"), "one more time");
        assert_eq!(normalize_title("Get Lucky (feat. Pharrell Williams)"), "get lucky");
        assert_eq!(normalize_title("Song [Remix]"), "song");
        assert_eq!(normalize_title("Song {Live at Wembley}"), "song");
        assert_eq!(normalize_title("Heroes (2017 Remaster)"), "heroes");
        assert_eq!(normalize_title("Get Lucky (Ft. Pharrell)"), "get lucky");
    }

    #[test]
    fn test_normalize_title_keeps_plain_brackets() {
        // No qualifier inside: the words are part of the title
        assert_eq!(
            normalize_title("(I Can't Get No) Satisfaction"),
            "i cant get no satisfaction"
        );
    }

    #[test]
    fn test_normalize_title_trailing_dash() {
        assert_eq!(normalize_title("Let It Be - Remastered 2009"), "let it be");
        assert_eq!(normalize_title("Here Comes The Sun - 2019 Mix"), "here comes the sun");
        assert_eq!(normalize_title("Song - Live - 2011 Remaster"), "song");
        assert_eq!(normalize_title("Wonderwall - 1995"), "wonderwall");
        // A dash without a qualifier stays (punctuation is then stripped)
        assert_eq!(normalize_title("Part One - The Beginning"), "part one the beginning");
    }

    #[test]
    fn test_normalize_title_unbracketed_feature() {
        assert_eq!(normalize_title("Stay feat. Justin Bieber"), "stay");
        assert_eq!(normalize_title("Stay ft. Justin Bieber"), "stay");
        // Only whole words count
        assert_eq!(normalize_title("Lift Off"), "lift off");
    }

    #[test]
    fn test_title_keeps_leading_article() {
        assert_eq!(normalize_title("The Less I Know The Better"), "the less i know the better");
    }

    #[test]
    fn test_qualifier_only_title_becomes_empty() {
        let key = NormalizedKey::new("Artist", "(Remix)");
        assert_eq!(key.title_key, "");
        assert!(key.is_empty());

        let key = NormalizedKey::new("!!!", "Song");
        assert!(key.is_empty());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let corpus = [
            ("The Beatles", "Let It Be - Remastered 2009"),
            ("Daft Punk", "One More Time (Radio Edit)"),
            ("Beyoncé", "Halo"),
            ("Simon & Garfunkel", "The Boxer"),
            ("The The", "This Is the Day"),
            ("Sigur Rós", "Hoppípolla"),
            ("Massive Attack", "Teardrop [Live]"),
            ("Justin Bieber", "Stay feat. The Kid LAROI"),
            ("Кино", "Группа крови"),
        ];

        for (artist, title) in corpus {
            let once = NormalizedKey::new(artist, title);
            let twice = NormalizedKey::new(&once.artist_key, &once.title_key);
            assert_eq!(once, twice, "not stable for {} - {}", artist, title);

            // Pure function: same input, same key
            assert_eq!(once, NormalizedKey::new(artist, title));
        }
    }

    #[test]
    fn test_normalize_does_not_touch_track() {
        let track = Track::new("The Beatles", "Let It Be (Remastered)", Platform::LastFm).unwrap();
        let key = normalize(&track);

        assert_eq!(key.artist_key, "beatles");
        assert_eq!(key.title_key, "let it be");
        assert_eq!(track.artist(), "The Beatles");
        assert_eq!(track.title(), "Let It Be (Remastered)");
    }
}
