/// Character that introduces a placeholder in a template body.
pub const SIGIL: char = '$';

/// A `$identifier` occurrence inside a template body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Identifier without the sigil.
    pub name: &'a str,
    /// Byte offset of the sigil.
    pub start: usize,
    /// Byte offset one past the last identifier character.
    pub end: usize,
}

/// Iterate over the placeholders in `body`, left to right.
///
/// An identifier is the longest run of ASCII letters, digits, and
/// underscores following the sigil, and must not start with a digit. A sigil
/// that is not followed by an identifier start (`$`, `$1`, `$-`) is plain
/// text.
///
/// # Offsets
///
/// The sigil and all identifier characters are ASCII. UTF-8 continuation and
/// lead bytes are >= 0x80 and never match, so every offset this iterator
/// yields lies on a char boundary.
pub fn placeholders(body: &str) -> Placeholders<'_> {
    Placeholders { body, pos: 0 }
}

/// Iterator returned by [`placeholders`].
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    body: &'a str,
    pos: usize,
}

impl<'a> Iterator for Placeholders<'a> {
    type Item = Placeholder<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let b = self.body.as_bytes();
        while self.pos < b.len() {
            let start = self.pos;
            self.pos += 1;
            if b[start] != SIGIL as u8 {
                continue;
            }
            if self.pos < b.len() && is_ident_start(b[self.pos]) {
                let name_start = self.pos;
                while self.pos < b.len() && is_ident_continue(b[self.pos]) {
                    self.pos += 1;
                }
                return Some(Placeholder {
                    name: &self.body[name_start..self.pos],
                    start,
                    end: self.pos,
                });
            }
        }
        None
    }
}

/// Collect the distinct placeholder names in `body`, in order of first
/// appearance.
///
/// ```
/// use callbook_core::detect_parameters;
/// let params = detect_parameters(r#"call $w $addr "m($x)" $w"#);
/// assert_eq!(params, ["w", "addr", "x"]);
/// ```
pub fn detect_parameters(body: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for ph in placeholders(body) {
        if !seen.iter().any(|s| s == ph.name) {
            seen.push(ph.name.to_string());
        }
    }
    seen
}

/// Whether `name` is a valid placeholder identifier.
pub fn is_identifier(name: &str) -> bool {
    let b = name.as_bytes();
    !b.is_empty() && is_ident_start(b[0]) && b[1..].iter().all(|&c| is_ident_continue(c))
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}
