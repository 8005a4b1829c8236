//! Text helpers shared by the noise generators and the analysis layer.

use crate::types::FieldName;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Heuristic sentence splitter; blank lines are hard boundaries.
pub fn sentences(text: &str) -> Vec<String> {
    let mut results = Vec::new();

    for block in text.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        let normalized = normalize_inline_whitespace(block);
        if normalized.is_empty() {
            continue;
        }
        push_block_sentences(&normalized, &mut results);
    }

    results
}

fn push_block_sentences(block: &str, results: &mut Vec<String>) {
    let chars: Vec<char> = block.chars().collect();
    let mut buffer = String::new();

    for (idx, ch) in chars.iter().enumerate() {
        buffer.push(*ch);
        if is_sentence_boundary(&chars, idx) {
            let trimmed = buffer.trim();
            if !trimmed.is_empty() {
                results.push(trimmed.to_string());
            }
            buffer.clear();
        }
    }

    let trailing = buffer.trim();
    if !trailing.is_empty() {
        results.push(trailing.to_string());
    }
}

fn is_sentence_boundary(chars: &[char], idx: usize) -> bool {
    match chars[idx] {
        '.' => is_dot_boundary(chars, idx),
        '!' | '?' => true,
        _ => false,
    }
}

fn is_dot_boundary(chars: &[char], idx: usize) -> bool {
    if is_decimal_middle(chars, idx) {
        return false;
    }
    if idx + 1 < chars.len() && chars[idx + 1] == '.' {
        return false;
    }
    true
}

fn is_decimal_middle(chars: &[char], idx: usize) -> bool {
    idx > 0
        && idx + 1 < chars.len()
        && chars[idx - 1].is_ascii_digit()
        && chars[idx + 1].is_ascii_digit()
}

/// True when `word` closes a sentence (`.`, `!`, `?`, optionally followed by
/// closing quotes or brackets).
pub fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(['"', '\'', ')', ']'])
        .ends_with(['.', '!', '?'])
}

/// Split `word` into leading punctuation, alphanumeric core, and trailing
/// punctuation. Inner apostrophes stay in the core (`doesn't`).
pub fn split_affixes(word: &str) -> (&str, &str, &str) {
    let start = word
        .char_indices()
        .find(|(_, ch)| ch.is_alphanumeric())
        .map(|(idx, _)| idx);
    let Some(start) = start else {
        return (word, "", "");
    };
    let end = word
        .char_indices()
        .rev()
        .find(|(_, ch)| ch.is_alphanumeric())
        .map(|(idx, ch)| idx + ch.len_utf8())
        .unwrap_or(word.len());
    (&word[..start], &word[start..end], &word[end..])
}

/// Render `replacement` with the letter case of `template` (UPPER, Title, or
/// lower).
pub fn match_case(template: &str, replacement: &str) -> String {
    let letters: Vec<char> = template.chars().filter(|ch| ch.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|ch| ch.is_uppercase()) {
        return replacement.to_uppercase();
    }
    match letters.first() {
        Some(first) if first.is_uppercase() => {
            let mut chars = replacement.chars();
            match chars.next() {
                Some(head) => head.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => replacement.to_string(),
    }
}

/// A text split into words with the exact whitespace between them.
///
/// `separators` always holds `words.len() + 1` entries: leading whitespace,
/// the gaps between words, and trailing whitespace. Rendering an unmodified
/// layout reproduces the input byte for byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordLayout {
    words: Vec<String>,
    separators: Vec<String>,
}

impl WordLayout {
    /// Split `text` on whitespace runs, keeping the runs.
    pub fn parse(text: &str) -> Self {
        let mut words = Vec::new();
        let mut separators = Vec::new();
        let mut current_sep = String::new();
        let mut current_word = String::new();
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !current_word.is_empty() {
                    words.push(std::mem::take(&mut current_word));
                }
                current_sep.push(ch);
            } else {
                if current_word.is_empty() {
                    separators.push(std::mem::take(&mut current_sep));
                }
                current_word.push(ch);
            }
        }
        if !current_word.is_empty() {
            words.push(current_word);
        }
        separators.push(current_sep);
        Self { words, separators }
    }

    /// Words in order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the text has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Replace the word at `idx`. Out-of-range indices are ignored.
    pub fn set_word(&mut self, idx: usize, word: String) {
        if let Some(slot) = self.words.get_mut(idx) {
            *slot = word;
        }
    }

    /// Swap two words. Out-of-range indices are ignored.
    pub fn swap_words(&mut self, a: usize, b: usize) {
        if a < self.words.len() && b < self.words.len() {
            self.words.swap(a, b);
        }
    }

    /// Insert `piece` as a new word before position `position` (or at the end
    /// when `position == len()`), separated by a single space.
    pub fn insert_word(&mut self, position: usize, piece: impl Into<String>) {
        let position = position.min(self.words.len());
        if self.words.is_empty() {
            self.words.push(piece.into());
            self.separators.push(String::new());
            return;
        }
        if position < self.words.len() {
            self.words.insert(position, piece.into());
            self.separators.insert(position + 1, " ".to_string());
        } else {
            self.words.push(piece.into());
            self.separators.insert(position, " ".to_string());
        }
    }

    /// Leading whitespace plus the first `count` words with their inner gaps.
    pub fn prefix(&self, count: usize) -> String {
        let count = count.min(self.words.len());
        let mut rendered = self.separators[0].clone();
        for idx in 0..count {
            if idx > 0 {
                rendered.push_str(&self.separators[idx]);
            }
            rendered.push_str(&self.words[idx]);
        }
        rendered
    }

    /// Reassemble the text with its original whitespace.
    pub fn render(&self) -> String {
        let mut rendered = self.prefix(self.words.len());
        if !self.words.is_empty() {
            rendered.push_str(&self.separators[self.words.len()]);
        }
        rendered
    }
}

/// Field names joined for log output.
pub fn join_fields<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a FieldName>,
{
    fields
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_inline_whitespace_collapses_runs() {
        let input = "Alpha\n\n  Beta\tGamma";
        assert_eq!(normalize_inline_whitespace(input), "Alpha Beta Gamma");
    }

    #[test]
    fn sentences_keep_decimal_values_together() {
        let text = "Price closed at 3.14. Outlook improved.";
        let result = sentences(text);
        assert_eq!(result, vec!["Price closed at 3.14.", "Outlook improved."]);
    }

    #[test]
    fn sentences_treat_blank_line_as_boundary() {
        let text = "First line without punctuation\n\nSecond line with more context.";
        let result = sentences(text);
        assert_eq!(
            result,
            vec![
                "First line without punctuation".to_string(),
                "Second line with more context.".to_string()
            ]
        );
    }

    #[test]
    fn word_layout_round_trips_exact_whitespace() {
        for text in ["", "   ", "one", "  two  words ", "tab\tand\nnewline"] {
            assert_eq!(WordLayout::parse(text).render(), text);
        }
        let layout = WordLayout::parse("  lead and trail  ");
        assert_eq!(layout.words(), ["lead", "and", "trail"]);
        assert_eq!(layout.prefix(2), "  lead and");
    }

    #[test]
    fn word_layout_insert_word_adds_single_spaces() {
        let mut layout = WordLayout::parse("Hello there.");
        layout.insert_word(0, "Well,");
        assert_eq!(layout.render(), "Well, Hello there.");
        layout.insert_word(layout.len(), "Bye.");
        assert_eq!(layout.render(), "Well, Hello there. Bye.");
        layout.insert_word(2, "over");
        assert_eq!(layout.render(), "Well, Hello over there. Bye.");
    }

    #[test]
    fn split_affixes_separates_punctuation() {
        assert_eq!(split_affixes("(Doesn't,"), ("(", "Doesn't", ","));
        assert_eq!(split_affixes("plain"), ("", "plain", ""));
        assert_eq!(split_affixes("..."), ("...", "", ""));
    }

    #[test]
    fn match_case_follows_template() {
        assert_eq!(match_case("THE", "teh"), "TEH");
        assert_eq!(match_case("The", "teh"), "Teh");
        assert_eq!(match_case("the", "teh"), "teh");
        assert_eq!(match_case("I", "are"), "Are");
    }

    #[test]
    fn ends_sentence_detects_terminal_punctuation() {
        assert!(ends_sentence("done."));
        assert!(ends_sentence("really?\""));
        assert!(!ends_sentence("comma,"));
    }
}
