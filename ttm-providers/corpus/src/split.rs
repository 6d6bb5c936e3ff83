//! Splitting policies that cut one text into a sequence of documents.

use clap::ValueEnum;
use ttm_core::{Result, TtmError};

/// Tokens per window when `--window` is not given.
pub const DEFAULT_WINDOW: usize = 300;

/// Splitting policy selected on the command line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum SplitMode {
    /// One document per blank-line separated paragraph.
    #[default]
    Paragraph,
    /// Fixed-size token windows.
    Window,
}

/// A sliding token window.
///
/// `size` must be a multiple of `step`, so that `size / step` steps add up to
/// exactly one window and documents that many positions apart never overlap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    size: usize,
    step: usize,
}

impl Window {
    /// Windows of `size` tokens starting every `step` tokens.
    ///
    /// # Errors
    /// Returns [`TtmError::Config`] when either value is zero or `size` is not
    /// divisible by `step`; the message suggests the nearest usable window.
    ///
    /// # Examples
    /// ```
    /// use ttm_providers_corpus::Window;
    ///
    /// let window = Window::new(300, 100)?;
    /// assert_eq!(window.stride(), 3);
    /// assert!(Window::new(300, 70).is_err());
    /// # Ok::<(), ttm_core::TtmError>(())
    /// ```
    pub fn new(size: usize, step: usize) -> Result<Self> {
        if size == 0 || step == 0 {
            return Err(TtmError::config("window", "window and step must be positive"));
        }
        let remainder = size % step;
        if remainder != 0 {
            let lower = size - remainder;
            let upper = lower + step;
            let suggestion = if lower > 0 && remainder < step - remainder {
                lower
            } else {
                upper
            };
            return Err(TtmError::config(
                "window",
                format!(
                    "window must be divisible by step, but {size} % {step} is {remainder}; \
                     consider a window of {suggestion}"
                ),
            ));
        }
        Ok(Self { size, step })
    }

    /// Overlapping windows that advance by half their size.
    ///
    /// # Errors
    /// Returns [`TtmError::Config`] when `size` is odd or zero.
    pub fn half_step(size: usize) -> Result<Self> {
        if size % 2 != 0 {
            return Err(TtmError::config(
                "window",
                format!("the step defaults to half the window, but {size} is odd; pass --step"),
            ));
        }
        Self::new(size, size / 2)
    }

    /// Tokens per window.
    #[must_use]
    pub const fn size(self) -> usize {
        self.size
    }

    /// Tokens between window starts.
    #[must_use]
    pub const fn step(self) -> usize {
        self.step
    }

    /// Number of steps that make up one window.
    #[must_use]
    pub const fn stride(self) -> usize {
        self.size / self.step
    }

    /// Cut `text` into windows after joining hyphenated line breaks and
    /// collapsing whitespace. A window is emitted for every start position up
    /// to the one whose window first reaches the last token, so the final
    /// window may be short.
    #[must_use]
    pub fn split(self, text: &str) -> Vec<String> {
        let joined = text.replace("-\n", "");
        let tokens: Vec<&str> = joined.split_whitespace().collect();
        let mut documents = Vec::new();
        let mut start = 0;
        while start + self.size < tokens.len() + self.step {
            let end = (start + self.size).min(tokens.len());
            documents.push(tokens[start..end].join(" "));
            start += self.step;
        }
        documents
    }
}

/// How a text becomes documents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Splitter {
    /// Blank-line separated paragraphs, kept verbatim.
    Paragraphs,
    /// Sliding token windows over normalised text.
    Windows(Window),
}

impl Splitter {
    /// Split `text` into documents.
    ///
    /// # Examples
    /// ```
    /// use ttm_providers_corpus::Splitter;
    ///
    /// let documents = Splitter::Paragraphs.split("first line\nsecond\n\n\nnext\n");
    /// assert_eq!(documents, vec!["first line\nsecond", "next"]);
    /// ```
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        match self {
            Self::Paragraphs => paragraphs(text),
            Self::Windows(window) => window.split(text),
        }
    }

    /// Distance between a document and the next one that does not overlap it.
    #[must_use]
    pub const fn stride(&self) -> usize {
        match self {
            Self::Paragraphs => 1,
            Self::Windows(window) => window.stride(),
        }
    }
}

/// Paragraphs as byte ranges of `text`, so line endings inside a paragraph
/// survive untouched. The terminator of a paragraph's last line is dropped.
fn paragraphs(text: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut span: Option<(usize, usize)> = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let content = line
            .strip_suffix('\n')
            .map_or(line, |rest| rest.strip_suffix('\r').unwrap_or(rest));
        if content.trim().is_empty() {
            if let Some((first, last)) = span.take() {
                documents.extend(text.get(first..last).map(str::to_owned));
            }
        } else {
            let end = start + content.len();
            span = Some(span.map_or((start, end), |(first, _)| (first, end)));
        }
    }
    if let Some((first, last)) = span {
        documents.extend(text.get(first..last).map(str::to_owned));
    }
    documents
}

/// Collapse every run of whitespace to one space and trim both ends.
#[must_use]
pub fn normalise_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(10, 4, 2, &["0 1 2 3", "2 3 4 5", "4 5 6 7", "6 7 8 9"])]
    #[case(5, 4, 4, &["0 1 2 3", "4"])]
    #[case(3, 4, 2, &["0 1 2"])]
    #[case(0, 4, 2, &[])]
    fn windows_cover_every_token(
        #[case] tokens: usize,
        #[case] size: usize,
        #[case] step: usize,
        #[case] expected: &[&str],
    ) -> ttm_core::Result<()> {
        let text = (0..tokens).map(|token| token.to_string()).collect::<Vec<_>>().join(" ");
        assert_eq!(Window::new(size, step)?.split(&text), expected);
        Ok(())
    }

    #[test]
    fn windows_join_hyphenated_line_breaks() -> ttm_core::Result<()> {
        let documents = Window::new(4, 4)?.split("a hyphen-\nated  word\n\tends");
        assert_eq!(documents, vec!["a hyphenated word ends"]);
        Ok(())
    }

    #[rstest]
    #[case(300, 70, "consider a window of 280")]
    #[case(300, 110, "consider a window of 330")]
    #[case(5, 0, "must be positive")]
    fn rejects_indivisible_windows(#[case] size: usize, #[case] step: usize, #[case] hint: &str) {
        let err = Window::new(size, step).expect_err("window is unusable");
        assert!(err.to_string().contains(hint), "{err}");
    }

    #[test]
    fn half_step_needs_an_even_window() -> ttm_core::Result<()> {
        assert_eq!(Window::half_step(300)?.step(), 150);
        assert!(Window::half_step(301).is_err());
        Ok(())
    }

    #[test]
    fn paragraphs_skip_whitespace_only_lines() {
        let documents = Splitter::Paragraphs.split("\n  one\r\n \t \ntwo\nthree  \n");
        assert_eq!(documents, vec!["  one", "two\nthree  "]);
    }

    #[rstest]
    #[case("a\r\nb\r\n\r\nc\r\n", &["a\r\nb", "c"])]
    #[case("a\nb\r\n\nc", &["a\nb", "c"])]
    #[case("\u{e9}t\u{e9}\r\n\u{fc}ber\n\n", &["\u{e9}t\u{e9}\r\n\u{fc}ber"])]
    fn paragraphs_keep_their_line_endings(#[case] text: &str, #[case] expected: &[&str]) {
        assert_eq!(Splitter::Paragraphs.split(text), expected);
    }

    #[test]
    fn normalises_whitespace() {
        assert_eq!(normalise_whitespace("  a \n\n b\tc "), "a b c");
    }
}
