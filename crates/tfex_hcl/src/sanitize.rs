//! Identifier sanitization.
//!
//! Cloud resource names may contain characters that are not legal in
//! Terraform block labels used as references. [`sanitize`] maps any string
//! to a legal identifier, and [`NameRegistry`] keeps identifiers unique
//! within one output unit.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

/// Longest identifier emitted.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Hex digits of the hash suffix used when truncating.
const HASH_SUFFIX_LEN: usize = 8;

/// Prefix for names that do not start with a letter.
const LETTER_PREFIX: &str = "r_";

/// Map an arbitrary name to a legal identifier.
///
/// The result matches `[a-z][a-z0-9_]*` and is at most
/// [`MAX_IDENTIFIER_LEN`] bytes. Over-long names keep their head and get a
/// hash of the full input as suffix, so distinct long names stay distinct.
/// `sanitize(sanitize(x)) == sanitize(x)` for every `x`.
pub fn sanitize(raw: &str) -> String {
    let mut out: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' { c } else { '_' })
        .collect();

    if !out.starts_with(|c: char| c.is_ascii_lowercase()) {
        out.insert_str(0, LETTER_PREFIX);
    }

    if out.len() > MAX_IDENTIFIER_LEN {
        let digest = hex::encode(Sha256::digest(raw.as_bytes()));
        let keep = MAX_IDENTIFIER_LEN - HASH_SUFFIX_LEN - 1;
        out.truncate(keep);
        out.push('_');
        out.push_str(&digest[..HASH_SUFFIX_LEN]);
    }

    out
}

/// Append a numeric suffix, shortening the base if needed.
fn with_suffix(base: &str, n: usize) -> String {
    let suffix = format!("_{}", n);
    let keep = base.len().min(MAX_IDENTIFIER_LEN - suffix.len());
    format!("{}{}", &base[..keep], suffix)
}

/// Hands out unique identifiers for one output unit.
///
/// The first name to sanitize to a given identifier gets it bare; later
/// ones get `_2`, `_3`, ... in first-seen order.
#[derive(Debug, Default)]
pub struct NameRegistry {
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an identifier for `raw`.
    pub fn claim(&mut self, raw: &str) -> String {
        let base = sanitize(raw);
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut n = self.next_suffix.get(&base).copied().unwrap_or(2);
        loop {
            let candidate = with_suffix(&base, n);
            n += 1;
            if self.used.insert(candidate.clone()) {
                self.next_suffix.insert(base, n);
                return candidate;
            }
        }
    }

    /// Number of identifiers handed out.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
