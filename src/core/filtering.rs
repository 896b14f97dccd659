//! Candidate transcript filtering shared by partials and finals.
//!
//! Recognizers produce a steady stream of junk on near-silence: filler
//! tokens, one-character fragments, and repeats of the previous window.
//! These checks are fast, synchronous, and purely textual.

use std::collections::HashSet;

use crate::config::PartialConfig;

/// Normalize a candidate for noise comparison and duplicate suppression:
/// trim, lowercase, and strip one trailing punctuation mark so that e.g.
/// `"You."` still matches the noise token `you`.
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim().to_lowercase();
    trimmed
        .strip_suffix(['.', ',', '!', '?'])
        .map(str::to_string)
        .unwrap_or(trimmed)
}

/// Whether a candidate is a known filler token.
pub fn is_noise(text: &str, noise_words: &HashSet<String>) -> bool {
    noise_words.contains(&normalize(text))
}

/// Validate a partial transcript candidate.
///
/// Returns the trimmed text to emit, or `None` when the candidate is empty,
/// too short for the current phase, too long, a consecutive duplicate of the
/// last emitted partial, or a noise token.
pub fn accept_partial(
    candidate: &str,
    first_partial_sent: bool,
    last_emitted: Option<&str>,
    config: &PartialConfig,
    noise_words: &HashSet<String>,
) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }

    let min_len = if first_partial_sent {
        config.min_text_len
    } else {
        config.min_text_len_first
    };
    let len = trimmed.chars().count();
    if len < min_len || len > config.max_text_len {
        return None;
    }

    if let Some(last) = last_emitted {
        if normalize(last) == normalize(trimmed) {
            return None;
        }
    }

    if is_noise(trimmed, noise_words) {
        return None;
    }

    Some(trimmed.to_string())
}

/// Validate a final transcript candidate.
///
/// Stricter than the partial path: there is no "early partial" excuse for a
/// filler token here. Returns the trimmed text, or `None` when the candidate
/// trims to a single character or less, or is a noise token.
pub fn accept_final(candidate: &str, noise_words: &HashSet<String>) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.chars().count() <= 1 {
        return None;
    }
    if is_noise(trimmed, noise_words) {
        return None;
    }
    Some(trimmed.to_string())
}
