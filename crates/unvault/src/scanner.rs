//! Token scanner
//!
//! Finds inline vault tokens in arbitrary text. A token is a header line
//!
//! ```text
//! $<TAG>;<version>;<cipher>[;<identity>]
//! ```
//!
//! followed by lines of hex digits (indentation allowed, as found in YAML
//! block scalars). Bodies are wrapped at 80 digits: a body line shorter than
//! that is the last one, and the next line is ordinary text even when it
//! looks like hex. A `$` that does not start a well-formed header is ordinary
//! text. A well-formed header with a missing or undecodable body is
//! reported as [`DecryptError::MalformedToken`] for that span only, and
//! scanning carries on after it.

use crate::cipher::LINE_WIDTH;
use crate::error::DecryptError;
use crate::token::{EncryptedToken, Span};
use regex::Regex;
use std::sync::LazyLock;

/// One scanner hit: where the token sits and what it parsed to.
pub type ScanItem = (Span, Result<EncryptedToken, DecryptError>);

#[allow(clippy::expect_used)]
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Z][A-Z0-9_]*);([^;\s]+);([^;\s]+)(?:;([^;\s]+))?[ \t]*(\r?\n|\z)")
        .expect("vault header pattern is valid")
});

/// Scan `text` for vault tokens.
///
/// The returned iterator is lazy, finite and yields hits leftmost-first without
/// overlap. Scanning is a pure function of `text`; calling `scan` again starts over.
#[must_use]
pub fn scan(text: &str) -> Scanner<'_> {
    Scanner { text, pos: 0 }
}

/// Parse `text` as exactly one token, ignoring surrounding whitespace.
///
/// # Errors
///
/// Returns [`DecryptError::MalformedToken`] when `text` is not a single
/// complete token, or the scanner's error for a token with a bad body.
pub fn parse_token(text: &str) -> Result<EncryptedToken, DecryptError> {
    let trimmed = text.trim();
    match scan(trimmed).next() {
        Some((span, parsed)) if span.start == 0 && span.end == trimmed.len() => parsed,
        Some((_, Err(err))) => Err(err),
        _ => Err(DecryptError::malformed("input is not a single vault token")),
    }
}

/// Lazy iterator over the tokens of one input, created by [`scan`].
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl Iterator for Scanner<'_> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }

        let caps = HEADER.captures_at(self.text, self.pos)?;
        let whole = caps.get(0)?;
        let terminator = caps.get(5)?;
        let start = whole.start();

        let header_only = Span::new(start, terminator.start());
        if terminator.is_empty() {
            self.pos = self.text.len();
            return Some((
                header_only,
                Err(DecryptError::malformed("token header has no body")),
            ));
        }

        let Some((body_end, digits)) = read_body(self.text, whole.end()) else {
            self.pos = header_only.end;
            return Some((
                header_only,
                Err(DecryptError::malformed("token header has no body")),
            ));
        };

        let span = Span::new(start, body_end);
        self.pos = body_end;

        let parsed = decode_body(&digits).map(|payload| EncryptedToken {
            format_tag: caps[1].to_string(),
            version: caps[2].to_string(),
            cipher_id: caps[3].to_string(),
            identity_hint: caps.get(4).map(|m| m.as_str().to_string()),
            payload,
        });

        if let Err(err) = &parsed {
            tracing::debug!(span = %span, error = %err, "Skipping malformed vault token");
        }
        Some((span, parsed))
    }
}

/// Collect hex body lines starting at `from`.
///
/// Only a full-width line continues onto the next one. Returns the offset just
/// past the last hex digit and the concatenated digits, or `None` when the
/// first line is not a body line.
fn read_body(text: &str, from: usize) -> Option<(usize, String)> {
    let mut cursor = from;
    let mut digits = String::new();
    let mut end = None;

    loop {
        let rest = &text[cursor..];
        let line_len = rest.find('\n').unwrap_or(rest.len());
        let line = &rest[..line_len];

        let content = line.trim_start_matches([' ', '\t']);
        let indent = line.len() - content.len();
        let hex_len = content.bytes().take_while(u8::is_ascii_hexdigit).count();
        let trailing_blank = content[hex_len..]
            .chars()
            .all(|c| matches!(c, ' ' | '\t' | '\r'));

        if hex_len == 0 || !trailing_blank {
            break;
        }

        digits.push_str(&content[..hex_len]);
        end = Some(cursor + indent + hex_len);

        if hex_len != LINE_WIDTH || line_len == rest.len() {
            break;
        }
        cursor += line_len + 1;
    }

    end.map(|end| (end, digits))
}

fn decode_body(digits: &str) -> Result<Vec<u8>, DecryptError> {
    if digits.len() % 2 != 0 {
        return Err(DecryptError::malformed(format!(
            "truncated body ({} hex digits)",
            digits.len()
        )));
    }
    hex::decode(digits).map_err(|e| DecryptError::malformed(format!("invalid body: {e}")))
}
