//! Reading and permuting the `h k l` prefix of a reflection line.
//!
//! A reflection line is a run of whitespace-separated tokens whose first
//! three are the Miller indices. Permuting rewrites the line as
//! `h l k <rest...>` joined by single spaces; the original spacing is not
//! kept for rewritten lines. Lines are handled as bytes: tokens after the
//! indices are copied as they are, whatever their encoding.
//!
//! # Parsing
//!
//! Two policies are available:
//!
//! - [`IndexParsing::Lenient`] reads the leading integer of each token and
//!   falls back to `0` when there is none, so `"12a"` is `12` and `"h"` is
//!   `0`. This matches how legacy tooling treated the column header that
//!   follows the start marker: it comes out as `0 0 0 I phase ...`. There
//!   is no size limit; the digits are kept as text.
//! - [`IndexParsing::Strict`] requires each token to be a whole `i64` and
//!   reports the first one that is not.
//!
//! # Missing indices
//!
//! [`swap_indices`] rejects a line with fewer than three tokens.
//! [`swap_indices_zero_filled`] reads the missing ones as `0` instead, so
//! `"1 2"` becomes `"1 0 2"` and an empty line becomes `"0 0 0"`.

use std::fmt;

/// How index tokens are turned into integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexParsing {
    #[default]
    Lenient,
    Strict,
}

impl IndexParsing {
    /// Decimal text of one index token, or `None` when the policy rejects
    /// it. Lenient parsing never rejects.
    pub fn parse(self, token: &[u8]) -> Option<String> {
        match self {
            IndexParsing::Lenient => Some(leading_integer(token)),
            IndexParsing::Strict => std::str::from_utf8(token)
                .ok()?
                .parse::<i64>()
                .ok()
                .map(|index| index.to_string()),
        }
    }
}

/// Why a line could not be permuted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    /// Fewer than three tokens.
    TooShort { tokens: usize },
    /// An index token rejected by strict parsing.
    NotAnInteger { token: String },
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Malformed::TooShort { tokens } => write!(f, "{} of 3 index tokens", tokens),
            Malformed::NotAnInteger { token } => write!(f, "{:?} is not an integer", token),
        }
    }
}

/// A successfully permuted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    pub line: Vec<u8>,
    /// Indices in output order, as written.
    pub hkl: [String; 3],
    /// How many missing index tokens were read as `0`.
    pub filled: usize,
}

/// Decimal text of the leading integer in `token`.
///
/// An optional sign is followed by ASCII digits, where a single `_` may sit
/// between two digits. Parsing stops at the first other byte; a token with
/// no digits is `0`. Leading zeros and a `+` sign are dropped, and `-0` is
/// `0`.
pub fn leading_integer(token: &[u8]) -> String {
    let (negative, rest) = match token.first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    let mut digits = String::new();
    for (i, &byte) in rest.iter().enumerate() {
        match byte {
            b'0'..=b'9' => {
                if !(digits.is_empty() && byte == b'0') {
                    digits.push(char::from(byte));
                }
            }
            b'_' if i > 0 && rest.get(i + 1).is_some_and(u8::is_ascii_digit) => {}
            _ => break,
        }
    }

    match (digits.is_empty(), negative) {
        (true, _) => "0".to_string(),
        (false, true) => format!("-{}", digits),
        (false, false) => digits,
    }
}

/// Splits on runs of ASCII whitespace, vertical tab included.
pub fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|&byte| byte.is_ascii_whitespace() || byte == b'\x0b')
        .filter(|token| !token.is_empty())
}

/// Exchange the second and third index of a reflection line.
///
/// Tokens after the third are kept as they are; the result is joined with
/// single spaces.
pub fn swap_indices(line: &[u8], parsing: IndexParsing) -> Result<Swap, Malformed> {
    permute(line, parsing, false)
}

/// Like [`swap_indices`], but missing index tokens are read as `0`.
pub fn swap_indices_zero_filled(line: &[u8], parsing: IndexParsing) -> Result<Swap, Malformed> {
    permute(line, parsing, true)
}

fn permute(line: &[u8], parsing: IndexParsing, zero_fill: bool) -> Result<Swap, Malformed> {
    let tokens: Vec<&[u8]> = tokens(line).collect();
    if tokens.len() < 3 && !zero_fill {
        return Err(Malformed::TooShort {
            tokens: tokens.len(),
        });
    }

    let mut hkl: [String; 3] = Default::default();
    for (i, slot) in hkl.iter_mut().enumerate() {
        *slot = match tokens.get(i) {
            Some(token) => parsing
                .parse(token)
                .ok_or_else(|| Malformed::NotAnInteger {
                    token: String::from_utf8_lossy(token).into_owned(),
                })?,
            None => "0".to_string(),
        };
    }
    let [h, k, l] = hkl;
    let permuted = [h, l, k];

    let mut out = Vec::with_capacity(line.len());
    for (i, index) in permuted.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        out.extend_from_slice(index.as_bytes());
    }
    for token in tokens.iter().skip(3) {
        out.push(b' ');
        out.extend_from_slice(token);
    }

    Ok(Swap {
        line: out,
        hkl: permuted,
        filled: 3usize.saturating_sub(tokens.len()),
    })
}
