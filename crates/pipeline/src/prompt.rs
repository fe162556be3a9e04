//! Prompt construction for article illustrations.
//!
//! The generation prompt is the article title with a randomly chosen
//! art-style phrase prepended, so repeated runs over a feed do not all
//! come out in the same look.

use rand::Rng;

/// Art-style phrases prepended to article titles.
pub const STYLES: &[&str] = &[
    "Style Realism.",
    "Style Surrealism.",
    "Style Abstract.",
    "Style Pop Art.",
    "Style Manga.",
    "Style Fantasy.",
    "Style Sci-Fi.",
    "Style Pixel Art.",
    "Style Minimalism.",
    "Style Cyberpunk.",
    "Style Steampunk.",
    "Style Cartoon.",
    "Style Watercolor.",
    "Style Concept Art.",
];

/// Pick a style phrase uniformly at random.
pub fn random_style() -> &'static str {
    STYLES[rand::rng().random_range(0..STYLES.len())]
}

/// The prompt handed to the workflow's text node: `<style> <title>`.
pub fn styled_prompt(style: &str, title: &str) -> String {
    format!("{style} {title}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_is_prepended_to_title() {
        assert_eq!(
            styled_prompt("Style Manga.", "Cats take over city hall"),
            "Style Manga. Cats take over city hall"
        );
    }

    #[test]
    fn random_style_comes_from_the_list() {
        for _ in 0..50 {
            assert!(STYLES.contains(&random_style()));
        }
    }
}
