//! Word tokenizer shared by the embedding and description methods.

/// Shortest token kept, in characters.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Split `text` into lowercase word tokens.
///
/// Words are maximal runs of alphanumeric characters and underscores; words
/// shorter than [`MIN_TOKEN_CHARS`] are dropped.
///
/// # Examples
/// ```
/// use ttm_providers_text::tokenize;
///
/// assert_eq!(tokenize("A cat's Hat_2!"), vec!["cat", "hat_2"]);
/// ```
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|word| word.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect()
}
