//! `%`-escape expansion for a single template token.
//!
//! Supported escapes:
//! - `%%` expands to a literal `%`
//! - `%F` expands to the path of the file that triggered the event
//!
//! Anything else after a `%` is an unknown escape: both bytes are dropped and
//! the escape is reported back to the caller. Expansion works on raw bytes, so
//! non UTF-8 paths are inserted exactly as the kernel knows them.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::Path;

pub const ESCAPE: u8 = b'%';
pub const FILE_ESCAPE: u8 = b'F';

/// An escape sequence the expander did not recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownEscape {
    /// Byte offset of the `%` inside the token.
    pub offset: usize,
    /// The character following `%`, or `None` for a trailing `%`.
    pub escape: Option<char>,
}

impl fmt::Display for UnknownEscape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.escape {
            Some(c) => write!(f, "%{c}"),
            None => write!(f, "trailing %"),
        }
    }
}

/// Result of expanding one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion<'a> {
    pub value: Cow<'a, OsStr>,
    pub unknown: Vec<UnknownEscape>,
}

impl Expansion<'_> {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty()
    }
}

/// Expand the escapes in `token` against the triggering file `path`.
///
/// Tokens without a `%` are borrowed as-is.
pub fn expand_token<'a>(token: &'a OsStr, path: &Path) -> Expansion<'a> {
    let bytes = token.as_bytes();
    if !bytes.contains(&ESCAPE) {
        return Expansion {
            value: Cow::Borrowed(token),
            unknown: Vec::new(),
        };
    }

    let file = path.as_os_str().as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut unknown = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b != ESCAPE {
            out.push(b);
            i += 1;
            continue;
        }

        let Some(&next) = bytes.get(i + 1) else {
            unknown.push(UnknownEscape {
                offset: i,
                escape: None,
            });
            break;
        };

        match next {
            ESCAPE => {
                out.push(ESCAPE);
                i += 2;
            }
            FILE_ESCAPE => {
                out.extend_from_slice(file);
                i += 2;
            }
            _ => {
                let rest = &bytes[i + 1..];
                let width = char_width(rest);
                let escape = std::str::from_utf8(&rest[..width])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                unknown.push(UnknownEscape {
                    offset: i,
                    escape: Some(escape),
                });
                i += 1 + width;
            }
        }
    }

    Expansion {
        value: Cow::Owned(OsString::from_vec(out)),
        unknown,
    }
}

/// Byte length of the (possibly multi-byte) character at the start of `rest`.
///
/// An unknown escape drops the whole character, not just its lead byte.
fn char_width(rest: &[u8]) -> usize {
    let want = match rest[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    };
    1 + rest[1..want.min(rest.len())]
        .iter()
        .take_while(|b| **b & 0xC0 == 0x80)
        .count()
}
