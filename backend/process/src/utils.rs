use std::{collections::HashSet, fs, io, path::Path, sync::LazyLock};

use bank::normalize;
use chrono::{NaiveDate, Utc};
use regex::Regex;

/// Letters only, inner hyphens allowed (`arc-en-ciel`, not `-ciel`).
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}+(?:-\p{L}+)*$").expect("word pattern is valid"));

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// One word per line, blank lines and `#` comments ignored, everything normalized.
pub fn load_wordlist(path: &Path) -> io::Result<Vec<String>> {
    let raw = fs::read_to_string(path)?;

    Ok(parse_wordlist(&raw))
}

pub fn parse_wordlist(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize)
        .collect()
}

pub fn sanitize(input: &str, min_len: usize, max_len: usize) -> Option<String> {
    let word = normalize(input);
    let length = word.chars().count();

    (WORD.is_match(&word) && (min_len..=max_len).contains(&length)).then_some(word)
}

/// Keeps words fit to be a daily answer, first occurrence order preserved.
pub fn clean_wordlist(words: &[String], min_len: usize, max_len: usize) -> Vec<String> {
    let mut seen = HashSet::new();

    words
        .iter()
        .filter_map(|word| sanitize(word, min_len, max_len))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        assert_eq!(sanitize("Chat", 3, 12), Some("chat".to_string()));
        assert_eq!(sanitize("  félin ", 3, 12), Some("félin".to_string()));
        assert_eq!(sanitize("arc-en-ciel", 3, 12), Some("arc-en-ciel".to_string()));
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(sanitize("il", 3, 12), None);
        assert_eq!(sanitize("anticonstitutionnellement", 3, 12), None);
        assert_eq!(sanitize("été", 3, 3), Some("été".to_string()));
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(sanitize("!@#$%^&*()", 1, 20), None);
        assert_eq!(sanitize("abc123", 1, 20), None);
        assert_eq!(sanitize("aujourd'hui", 1, 20), None);
        assert_eq!(sanitize("pomme de terre", 1, 20), None);
    }

    #[test]
    fn test_dangling_hyphens() {
        assert_eq!(sanitize("-ciel", 1, 20), None);
        assert_eq!(sanitize("arc-", 1, 20), None);
        assert_eq!(sanitize("arc--ciel", 1, 20), None);
    }

    #[test]
    fn test_parse_wordlist() {
        let raw = "# french nouns\nChat\n\n  chien  \n#skip\nfélin\n";

        assert_eq!(parse_wordlist(raw), vec!["chat", "chien", "félin"]);
    }

    #[test]
    fn test_clean_wordlist_dedupes() {
        let words = parse_wordlist("chat\nCHAT\nil\nchien\n42\n");

        assert_eq!(clean_wordlist(&words, 3, 12), vec!["chat", "chien"]);
    }
}
