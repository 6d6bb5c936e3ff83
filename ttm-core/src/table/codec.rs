//! Linear TSV field codec.
//!
//! Records are single lines of TAB-separated fields. Inside a field the
//! backslash, TAB, LF and CR characters are written as `\\`, `\t`, `\n` and
//! `\r`. Decoding keeps unknown escapes verbatim so plain TSV written by other
//! tools still parses.

use std::borrow::Cow;
use std::io::{self, Write};

const DELIMITER: char = '\t';

/// Escape a single field for writing.
///
/// # Examples
/// ```
/// use ttm_core::table::codec::escape_field;
///
/// assert_eq!(escape_field("plain"), "plain");
/// assert_eq!(escape_field("a\tb\\c\n"), "a\\tb\\\\c\\n");
/// ```
#[must_use]
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if !field.contains(['\\', '\t', '\n', '\r']) {
        return Cow::Borrowed(field);
    }
    let mut escaped = String::with_capacity(field.len() + 8);
    for ch in field.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Reverse [`escape_field`].
///
/// # Examples
/// ```
/// use ttm_core::table::codec::unescape_field;
///
/// assert_eq!(unescape_field("a\\tb"), "a\tb");
/// assert_eq!(unescape_field("C:\\dir"), "C:\\dir");
/// ```
#[must_use]
pub fn unescape_field(field: &str) -> Cow<'_, str> {
    if !field.contains('\\') {
        return Cow::Borrowed(field);
    }
    let mut decoded = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => decoded.push('\\'),
            Some('t') => decoded.push('\t'),
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    Cow::Owned(decoded)
}

/// Split one physical line into decoded fields.
///
/// A trailing carriage return left over from CRLF line endings is dropped.
#[must_use]
pub fn split_record(line: &str) -> Vec<String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.split(DELIMITER)
        .map(|field| unescape_field(field).into_owned())
        .collect()
}

/// Write `fields` as one record terminated by a newline.
///
/// # Errors
/// Returns any [`io::Error`] raised by `writer`.
pub fn write_record<'a, W, I>(writer: &mut W, fields: I) -> io::Result<()>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    let mut first = true;
    for field in fields {
        if !first {
            writer.write_all(b"\t")?;
        }
        first = false;
        writer.write_all(escape_field(field).as_bytes())?;
    }
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::plain("hello", "hello")]
    #[case::tab("a\tb", "a\\tb")]
    #[case::newline("line\nbreak", "line\\nbreak")]
    #[case::carriage_return("a\rb", "a\\rb")]
    #[case::backslash("back\\slash", "back\\\\slash")]
    #[case::escaped_looking("\\t", "\\\\t")]
    fn escapes_special_characters(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_field(raw), expected);
        assert_eq!(unescape_field(expected), raw);
    }

    #[rstest]
    #[case::unknown_escape("a\\qb", "a\\qb")]
    #[case::trailing_backslash("end\\", "end\\")]
    fn unescape_is_lenient(#[case] encoded: &str, #[case] expected: &str) {
        assert_eq!(unescape_field(encoded), expected);
    }

    #[test]
    fn split_record_drops_trailing_carriage_return() {
        assert_eq!(split_record("id\ttext\r"), vec!["id", "text"]);
    }

    #[test]
    fn split_record_keeps_empty_fields() {
        assert_eq!(split_record("a\t\t"), vec!["a", "", ""]);
    }

    #[test]
    fn write_record_joins_escaped_fields() -> std::io::Result<()> {
        let mut buffer = Vec::new();
        write_record(&mut buffer, ["x:0", "a\tb"])?;
        assert_eq!(buffer, b"x:0\ta\\tb\n");
        Ok(())
    }
}
