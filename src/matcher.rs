//! Keyword matching engine.
//!
//! A subscriber profile is a list of pattern strings. Bracketed patterns
//! (`[rust]`) are required: every one of them must match before the
//! profile can match at all. The remaining patterns are optional: at
//! least one must match, unless the profile has no optional patterns.
//! Inside a pattern, `a|b` is an OR group, `a+b` is an AND group, and a
//! trailing `*` turns a word into a prefix match. Multi-word patterns
//! must appear as adjacent words in the message, in order.
//!
//! Matching is case-insensitive and operates on whole words: `java`
//! does not match "javascript", `java*` does.

/// Returns the patterns that made `text` match the profile, or `None`
/// when the profile rejects the message.
///
/// On a match the returned list holds every required pattern plus the
/// first optional pattern that matched; optional patterns are evaluated
/// in list order and short-circuit.
pub fn matching_keywords(text: &str, patterns: &[String]) -> Option<Vec<String>> {
    let text = text.to_lowercase();
    let words = tokenize(&text);

    let mut required = Vec::new();
    let mut optional = Vec::new();

    for pattern in patterns {
        match required_pattern(pattern) {
            Some(inner) => {
                if !inner.is_empty() {
                    required.push((pattern, inner));
                }
            }
            None => optional.push(pattern),
        }
    }

    let mut matched: Vec<String> = Vec::new();

    for (pattern, inner) in required {
        if !pattern_matches(&words, inner) {
            return None;
        }

        matched.push(pattern.clone());
    }

    if optional.is_empty() {
        if matched.is_empty() {
            return None;
        }

        return Some(matched);
    }

    for pattern in optional {
        if pattern_matches(&words, pattern) {
            matched.push(pattern.clone());

            return Some(matched);
        }
    }

    None
}

pub fn matches_keywords(text: &str, patterns: &[String]) -> bool {
    matching_keywords(text, patterns).is_some()
}

/// A match against any ignore pattern vetoes forwarding. Ignore
/// patterns have no required/optional split; each one is evaluated with
/// the same AND/OR/wildcard rules as a single keyword pattern.
pub fn matches_ignore_keywords(text: &str, ignore_patterns: &[String]) -> bool {
    if ignore_patterns.is_empty() {
        return false;
    }

    let text = text.to_lowercase();
    let words = tokenize(&text);

    ignore_patterns
        .iter()
        .any(|pattern| pattern_matches(&words, pattern))
}

/// `[rust]` -> `Some("rust")`, anything unbracketed -> `None`.
fn required_pattern(pattern: &str) -> Option<&str> {
    let pattern = pattern.trim();

    if pattern.starts_with('[') && pattern.ends_with(']') && pattern.len() >= 2 {
        Some(pattern[1..pattern.len() - 1].trim())
    } else {
        None
    }
}

fn pattern_matches(words: &[&str], pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();

    if pattern.contains('+') {
        pattern
            .split('+')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .all(|part| alternatives_match(words, part))
    } else {
        alternatives_match(words, &pattern)
    }
}

fn alternatives_match(words: &[&str], pattern: &str) -> bool {
    if pattern.contains('|') {
        pattern
            .split('|')
            .map(str::trim)
            .filter(|alternative| !alternative.is_empty())
            .any(|alternative| unit_matches(words, alternative))
    } else {
        unit_matches(words, pattern)
    }
}

/// Matches one pattern unit (no `+`, no `|`) against the message words.
/// Multi-word units must appear as an adjacent word sequence.
fn unit_matches(words: &[&str], unit: &str) -> bool {
    let unit_words: Vec<&str> = unit.split_whitespace().collect();

    match unit_words.len() {
        0 => false,
        1 => words.iter().any(|word| word_matches(word, unit_words[0])),
        len => {
            if words.len() < len {
                return false;
            }

            words.windows(len).any(|window| {
                window
                    .iter()
                    .zip(&unit_words)
                    .all(|(word, unit_word)| word_matches(word, unit_word))
            })
        }
    }
}

fn word_matches(word: &str, pattern_word: &str) -> bool {
    match pattern_word.strip_suffix('*') {
        // A bare `*` (empty prefix) never matches anything.
        Some("") => false,
        Some(prefix) => word.starts_with(prefix),
        None => word == pattern_word,
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|character: char| !(character.is_alphanumeric() || character == '_'))
        .filter(|word| !word.is_empty())
        .collect()
}
