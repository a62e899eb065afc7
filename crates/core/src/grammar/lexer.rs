use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Byte span in the source text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character (0-based).
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Create a span covering `[start, end)`.
    ///
    /// Panics if `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "Span end ({end}) < start ({start})");
        Self { start, end }
    }

    /// Create a zero-width span at the given position.
    pub fn empty(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// A single token produced by [`tokenize_spanned`].
///
/// `text` has its quote characters removed, so it is owned rather than
/// borrowed from the input. `span` covers the raw source text of the token,
/// quotes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text with quote characters consumed.
    pub text: String,
    /// Source span of the raw token.
    pub span: Span,
}

/// Split `input` into tokens, honoring single and double quotes.
///
/// Unquoted whitespace separates tokens; whitespace inside a quoted span is
/// kept. Quote characters are dropped from the token text and do not end a
/// token by themselves, so `a"b c"d` is the single token `ab cd`.
///
/// An unterminated quote is not an error: the remainder of the input becomes
/// part of the open token.
///
/// ```
/// use callbook_core::tokenize;
/// assert_eq!(tokenize(r#"call a "b c" d"#), ["call", "a", "b c", "d"]);
/// ```
pub fn tokenize(input: &str) -> Vec<String> {
    tokenize_spanned(input)
        .into_iter()
        .map(|tok| tok.text)
        .collect()
}

/// Tokenize `input`, keeping the source span of each token.
///
/// Same rules as [`tokenize`]. A quoted empty string (`""` or `''`) yields an
/// empty token, matching shell behaviour.
pub fn tokenize_spanned(input: &str) -> Vec<Token> {
    let mut toks = Vec::new();
    let mut text = String::new();
    let mut start: Option<usize> = None;
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => text.push(c),
            None if c == '"' || c == '\'' => {
                start.get_or_insert(i);
                quote = Some(c);
            }
            None if c.is_whitespace() => {
                if let Some(s) = start.take() {
                    toks.push(Token {
                        text: std::mem::take(&mut text),
                        span: Span::new(s, i),
                    });
                }
            }
            None => {
                start.get_or_insert(i);
                text.push(c);
            }
        }
    }

    // Flush the trailing token, including one left open by a missing quote.
    if let Some(s) = start {
        toks.push(Token {
            text,
            span: Span::new(s, input.len()),
        });
    }
    toks
}

/// Join tokens back into a single string that [`tokenize`] splits into the
/// same tokens.
///
/// Tokens without whitespace or quote characters are emitted bare. Others are
/// wrapped in double quotes, or single quotes when they contain a double
/// quote. A token containing both quote kinds is emitted as adjacent quoted
/// segments (`"it's "'"'"ok"'"'`), which the tokenizer glues back together.
pub fn detokenize<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| quote_token(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_token(token: &str) -> Cow<'_, str> {
    let needs_quotes = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'');
    if !needs_quotes {
        return Cow::Borrowed(token);
    }
    if !token.contains('"') {
        return Cow::Owned(format!("\"{token}\""));
    }
    if !token.contains('\'') {
        return Cow::Owned(format!("'{token}'"));
    }

    // Mixed quotes: double-quoted runs, with each `"` emitted as `'"'`.
    let mut out = String::with_capacity(token.len() + 8);
    let mut in_run = false;
    for c in token.chars() {
        if c == '"' {
            if in_run {
                out.push('"');
                in_run = false;
            }
            out.push_str("'\"'");
        } else {
            if !in_run {
                out.push('"');
                in_run = true;
            }
            out.push(c);
        }
    }
    if in_run {
        out.push('"');
    }
    Cow::Owned(out)
}
