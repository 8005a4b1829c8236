//! Grammar noise: typos, word transpositions, punctuation and agreement errors.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::constants::grammar::{
    AGREEMENT_SWAPS, COMMON_MISSPELLINGS, CONFUSABLE_PAIRS, EXCESS_PUNCTUATION, MIN_WORDS,
};
use crate::utils::{WordLayout, match_case, split_affixes};

/// Individual grammar corruptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrammarOp {
    /// Swap a letter for its confusable partner, or use a canned misspelling.
    Typo,
    /// Swap two adjacent, distinct words.
    Transposition,
    /// Drop, swap, or pile up punctuation.
    Punctuation,
    /// Swap a verb form to break subject-verb agreement.
    Agreement,
}

impl GrammarOp {
    /// Every operation, in draw order.
    pub const ALL: [GrammarOp; 4] = [
        GrammarOp::Typo,
        GrammarOp::Transposition,
        GrammarOp::Punctuation,
        GrammarOp::Agreement,
    ];

    /// Apply this corruption, or return `None` when the text offers nothing it
    /// can act on.
    pub fn apply<R: Rng + ?Sized>(self, text: &str, rng: &mut R) -> Option<String> {
        match self {
            GrammarOp::Typo => typo(text, rng),
            GrammarOp::Transposition => transpose(text, rng),
            GrammarOp::Punctuation => Some(corrupt_punctuation(text, rng)),
            GrammarOp::Agreement => break_agreement(text, rng),
        }
    }
}

/// Apply one or two grammar corruptions.
///
/// Texts shorter than two words are returned unchanged; for anything longer
/// the output is guaranteed to differ from the input.
pub fn generate<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    if WordLayout::parse(text).len() < MIN_WORDS {
        return text.to_string();
    }
    let mut ops = GrammarOp::ALL.to_vec();
    ops.shuffle(rng);
    let wanted = rng.random_range(1..=2usize);

    let mut current = text.to_string();
    let mut applied = 0;
    for op in ops {
        if applied == wanted {
            break;
        }
        if let Some(next) = op.apply(&current, rng) {
            if next != current {
                current = next;
                applied += 1;
            }
        }
    }
    if current == text {
        // Two ops can cancel out; trailing punctuation always changes the text.
        current = format!("{text}{EXCESS_PUNCTUATION}");
    }
    current
}

fn confusable_partner(ch: char) -> Option<char> {
    let lower = ch.to_ascii_lowercase();
    let partner = CONFUSABLE_PAIRS.iter().find_map(|(a, b)| {
        if *a == lower {
            Some(*b)
        } else if *b == lower {
            Some(*a)
        } else {
            None
        }
    })?;
    Some(if ch.is_ascii_uppercase() {
        partner.to_ascii_uppercase()
    } else {
        partner
    })
}

fn misspelling_for(core: &str) -> Option<&'static [&'static str; 2]> {
    let lower = core.to_lowercase();
    COMMON_MISSPELLINGS
        .iter()
        .find(|(word, _)| *word == lower)
        .map(|(_, variants)| variants)
}

fn typo<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<String> {
    let mut layout = WordLayout::parse(text);
    let candidates: Vec<usize> = layout
        .words()
        .iter()
        .enumerate()
        .filter(|(_, word)| {
            let (_, core, _) = split_affixes(word);
            misspelling_for(core).is_some()
                || core.chars().any(|ch| confusable_partner(ch).is_some())
        })
        .map(|(idx, _)| idx)
        .collect();
    let idx = *candidates.choose(rng)?;
    let word = layout.words()[idx].clone();
    let (prefix, core, suffix) = split_affixes(&word);

    let replaced = match misspelling_for(core) {
        Some(variants) => {
            let variant = variants.choose(rng)?;
            match_case(core, variant)
        }
        None => {
            let positions: Vec<(usize, char)> = core
                .char_indices()
                .filter_map(|(pos, ch)| confusable_partner(ch).map(|partner| (pos, partner)))
                .collect();
            let (pos, partner) = *positions.choose(rng)?;
            let mut out = String::with_capacity(core.len());
            for (at, ch) in core.char_indices() {
                out.push(if at == pos { partner } else { ch });
            }
            out
        }
    };
    layout.set_word(idx, format!("{prefix}{replaced}{suffix}"));
    Some(layout.render())
}

fn transpose<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<String> {
    let mut layout = WordLayout::parse(text);
    let words = layout.words();
    let candidates: Vec<usize> = (0..words.len().saturating_sub(1))
        .filter(|idx| words[*idx] != words[*idx + 1])
        .collect();
    let idx = *candidates.choose(rng)?;
    layout.swap_words(idx, idx + 1);
    Some(layout.render())
}

/// Punctuation corruptions that change the text; appending excess
/// punctuation is always available.
fn corrupt_punctuation<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let mut variants: Vec<String> = [
        text.replace('.', ""),
        text.replace(',', ""),
        text.replace('.', "!"),
        text.replace('?', "."),
        text.replace(',', ";"),
    ]
    .into_iter()
    .filter(|variant| variant != text)
    .collect();
    variants.push(format!("{text}{EXCESS_PUNCTUATION}"));
    variants
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| format!("{text}{EXCESS_PUNCTUATION}"))
}

fn agreement_swap(core: &str) -> Option<&'static str> {
    let lower = core.to_lowercase();
    AGREEMENT_SWAPS.iter().find_map(|(singular, plural)| {
        if *singular == lower {
            Some(*plural)
        } else if *plural == lower {
            Some(*singular)
        } else {
            None
        }
    })
}

fn break_agreement<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Option<String> {
    let mut layout = WordLayout::parse(text);
    let candidates: Vec<usize> = layout
        .words()
        .iter()
        .enumerate()
        .filter(|(_, word)| agreement_swap(split_affixes(word).1).is_some())
        .map(|(idx, _)| idx)
        .collect();
    let idx = *candidates.choose(rng)?;
    let word = layout.words()[idx].clone();
    let (prefix, core, suffix) = split_affixes(&word);
    let swapped = agreement_swap(core)?;
    layout.set_word(idx, format!("{prefix}{}{suffix}", match_case(core, swapped)));
    Some(layout.render())
}
