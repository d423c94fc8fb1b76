//! Name generation
//!
//! Names are the class (or keyframes) identifiers actually written into the
//! document. A [`NameGenerator`] is injected into the sheet so tests can
//! swap the strategy instead of patching shared state.

pub mod hash;

use std::collections::VecDeque;

use hash::{HashFn, content_hash};

const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Encode `code` in bijective base 52 over `a-z` then `A-Z`.
///
/// `0 -> a`, `51 -> Z`, `52 -> aa`. Any `ad` pair (any case) is split with a
/// hyphen so ad blockers do not hide the element; the mapping stays
/// injective.
pub fn alphabetic_name(code: u64) -> String {
    let mut n = code;
    let mut reversed = Vec::new();
    loop {
        reversed.push(ALPHABET[(n % 52) as usize] as char);
        if n < 52 {
            break;
        }
        n = n / 52 - 1;
    }

    let mut name = String::with_capacity(reversed.len() + 1);
    let mut prev: Option<char> = None;
    for c in reversed.into_iter().rev() {
        if matches!(prev, Some('a' | 'A')) && matches!(c, 'd' | 'D') {
            name.push('-');
        }
        name.push(c);
        prev = Some(c);
    }
    name
}

/// Turn a display name into something usable inside an id: runs of
/// punctuation and whitespace become one `-`, and leading/trailing dashes
/// are dropped. A leading digit gets a `_` prefix.
pub fn escape_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Strategy for turning a cache key into a name.
pub trait NameGenerator: Send + std::fmt::Debug {
    /// Produce a name for `key`. `in_use` reports names the sheet has
    /// already emitted or rehydrated; sequence-based strategies skip them.
    fn generate(&mut self, key: &str, in_use: &dyn Fn(&str) -> bool) -> String;

    /// Rewind to the initial state.
    fn reset(&mut self) {}
}

/// Infinite sequence `a, b, ..., Z, aa, ab, ...`, skipping used names.
#[derive(Debug, Default, Clone)]
pub struct SequentialNames {
    cursor: u64,
}

impl SequentialNames {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameGenerator for SequentialNames {
    fn generate(&mut self, _key: &str, in_use: &dyn Fn(&str) -> bool) -> String {
        loop {
            let name = alphabetic_name(self.cursor);
            self.cursor += 1;
            if !in_use(&name) {
                return name;
            }
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Name derived from a hash of the key: the same key yields the same name in
/// every process, which is what server and client must agree on.
#[derive(Debug, Clone)]
pub struct HashedNames {
    hasher: HashFn,
}

impl HashedNames {
    pub fn new() -> Self {
        Self::with_hasher(content_hash)
    }

    pub fn with_hasher(hasher: HashFn) -> Self {
        Self { hasher }
    }
}

impl NameGenerator for HashedNames {
    fn generate(&mut self, key: &str, _in_use: &dyn Fn(&str) -> bool) -> String {
        alphabetic_name((self.hasher)(key))
    }
}

/// Hands out a seeded list of names in order, then falls back to a sequence.
#[derive(Debug, Clone)]
pub struct FixedNames {
    seeded: Vec<String>,
    queue: VecDeque<String>,
    fallback: SequentialNames,
}

impl FixedNames {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let seeded: Vec<String> = names.into_iter().map(Into::into).collect();
        Self {
            queue: seeded.iter().cloned().collect(),
            seeded,
            fallback: SequentialNames::new(),
        }
    }
}

impl NameGenerator for FixedNames {
    fn generate(&mut self, key: &str, in_use: &dyn Fn(&str) -> bool) -> String {
        match self.queue.pop_front() {
            Some(name) => name,
            None => self.fallback.generate(key, in_use),
        }
    }

    fn reset(&mut self) {
        self.queue = self.seeded.iter().cloned().collect();
        self.fallback.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none_used(_: &str) -> bool {
        false
    }

    #[test]
    fn test_alphabetic_name_boundaries() {
        assert_eq!(alphabetic_name(0), "a");
        assert_eq!(alphabetic_name(25), "z");
        assert_eq!(alphabetic_name(26), "A");
        assert_eq!(alphabetic_name(51), "Z");
        assert_eq!(alphabetic_name(52), "aa");
        assert_eq!(alphabetic_name(53), "ab");
        assert_eq!(alphabetic_name(52 + 52 * 52), "aaa");
    }

    #[test]
    fn test_alphabetic_name_splits_ad() {
        // 52 + 3 = "ad"
        assert_eq!(alphabetic_name(55), "a-d");
        assert!(!alphabetic_name(u64::MAX).to_lowercase().contains("ad"));
    }

    #[test]
    fn test_sequential_skips_used_names() {
        let mut names = SequentialNames::new();
        let used = |n: &str| n == "b";
        assert_eq!(names.generate("k1", &used), "a");
        assert_eq!(names.generate("k2", &used), "c");
        names.reset();
        assert_eq!(names.generate("k3", &none_used), "a");
    }

    #[test]
    fn test_hashed_is_deterministic() {
        let mut a = HashedNames::new();
        let mut b = HashedNames::new();
        assert_eq!(a.generate("key", &none_used), b.generate("key", &none_used));
        assert_ne!(a.generate("key", &none_used), a.generate("other", &none_used));
    }

    #[test]
    fn test_fixed_falls_back_and_resets() {
        let mut names = FixedNames::new(["x", "y"]);
        assert_eq!(names.generate("", &none_used), "x");
        assert_eq!(names.generate("", &none_used), "y");
        assert_eq!(names.generate("", &none_used), "a");
        names.reset();
        assert_eq!(names.generate("", &none_used), "x");
    }

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("Button"), "Button");
        assert_eq!(escape_identifier("styled.div"), "styled-div");
        assert_eq!(escape_identifier("  My  (Fancy) Card! "), "My-Fancy-Card");
        assert_eq!(escape_identifier("3col"), "_3col");
    }
}
