//! Naming conventions for delivered artifacts.
//!
//! Article titles become filenames, so they are reduced to a safe
//! alphanumeric form; delivered images are grouped into `year/month`
//! directories derived from the article's creation timestamp.

use std::sync::LazyLock;

use regex::Regex;

use crate::Timestamp;

/// Matches every character that is neither a word character nor
/// whitespace. These are stripped from titles before use as filenames.
static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Reduce a title to a filename-safe form.
///
/// Strips all characters that are neither alphanumeric-word nor
/// whitespace, then replaces each remaining whitespace run with a
/// single `_`. Leading and trailing whitespace is dropped.
///
/// ```
/// use newsart_core::naming::safe_title;
///
/// assert_eq!(safe_title("Cat's Big Day: Part 2!"), "Cats_Big_Day_Part_2");
/// ```
pub fn safe_title(title: &str) -> String {
    let stripped = STRIP_RE.replace_all(title, "");
    stripped.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Filename under which an article's illustration is stored.
pub fn article_image_filename(title: &str) -> String {
    format!("{}.jpg", safe_title(title))
}

/// Dated directory segment for a delivered artifact: `year/month`,
/// month zero-padded to two digits (e.g. `2024/03`).
pub fn month_folder(at: &Timestamp) -> String {
    use chrono::Datelike;
    format!("{}/{:02}", at.year(), at.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn strips_punctuation_and_joins_with_underscores() {
        assert_eq!(safe_title("Cat's Big Day: Part 2!"), "Cats_Big_Day_Part_2");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(safe_title("breaking   news,  today"), "breaking_news_today");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(safe_title("  spaced out  "), "spaced_out");
    }

    #[test]
    fn keeps_word_characters() {
        assert_eq!(safe_title("already_safe_42"), "already_safe_42");
    }

    #[test]
    fn all_punctuation_yields_empty() {
        assert_eq!(safe_title("?!..."), "");
    }

    #[test]
    fn image_filename_appends_extension() {
        assert_eq!(article_image_filename("Cat's Big Day: Part 2!"), "Cats_Big_Day_Part_2.jpg");
    }

    #[test]
    fn month_folder_zero_pads() {
        let at = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(month_folder(&at), "2024/03");
    }

    #[test]
    fn month_folder_two_digit_month() {
        let at = chrono::Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(month_folder(&at), "2025/11");
    }
}
