//! Share slug generation.
//!
//! A share slug is the final path segment of an outfit's public link. It is
//! built from the outfit name plus a short random suffix:
//!
//! ```text
//! base   = lowercase(name), keep [a-z0-9], whitespace and '-',
//!          whitespace runs -> '-', '-' runs -> '-', trim '-'
//! suffix = 6 chars drawn uniformly from [0-9a-z]
//! slug   = base + "-" + suffix
//! ```
//!
//! When nothing survives from the name (all emoji, all punctuation) the base
//! is empty and the slug takes the shape `-{suffix}`. That shape is valid and
//! still unique through its suffix.
//!
//! Slugs are not secrets. Any PRNG will do for the suffix.

use rand::Rng;

/// Alphabet used for random suffixes (base 36).
pub const SUFFIX_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Default random suffix length.
pub const DEFAULT_SUFFIX_LEN: usize = 6;

/// Derive the base token of a slug from an outfit name.
///
/// The result only contains `[a-z0-9-]`, never starts or ends with `-`,
/// never contains `--`, and may be empty.
///
/// Word breaks are the characters of the ECMAScript `\s` class, which is
/// close to but not the same as [`char::is_whitespace`]: U+FEFF breaks a
/// word, U+0085 (next line) is dropped like any other symbol.
pub fn base_token(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else if is_word_break(ch) || ch == '-' {
            pending_hyphen = true;
        }
        // everything else is dropped without breaking the current word
    }

    out
}

fn is_word_break(ch: char) -> bool {
    match ch {
        '\u{feff}' => true,
        '\u{85}' => false,
        _ => ch.is_whitespace(),
    }
}

/// Join a base token and suffix into a slug candidate.
pub fn candidate(base: &str, suffix: &str) -> String {
    let mut slug = String::with_capacity(base.len() + 1 + suffix.len());
    slug.push_str(base);
    slug.push('-');
    slug.push_str(suffix);
    slug
}

/// Draw a random base-36 suffix of `len` characters.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Return `true` when `value` only uses the share slug character set.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

/// Source of random slug suffixes.
///
/// The allocator draws one suffix per attempt. Tests substitute a scripted
/// source to force collisions deterministically.
pub trait SuffixSource: Send + Sync {
    /// Produce a suffix of exactly `len` characters from [`SUFFIX_ALPHABET`].
    fn next_suffix(&self, len: usize) -> String;
}

/// Suffix source backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn next_suffix(&self, len: usize) -> String {
        random_suffix(&mut rand::thread_rng(), len)
    }
}
