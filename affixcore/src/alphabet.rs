//! Bijection between the characters actually seen in an affix file (and
//! the word list being converted) and a compact run of byte indices
//! `0..N`. Every other component in this crate — conditions, tries,
//! the rule sets themselves — works on the encoded bytes rather than on
//! `char`, which is what lets the trie nodes use fixed-size children
//! arrays instead of a hash map per node.
//!
//! The tradeoff is the 256-codepoint ceiling this implies; see
//! `AlphabetOverflow` in [`crate::error`].

use fnv::FnvHashMap;

use crate::error::{AffixError, Result};

#[derive(Clone, Debug, Default)]
pub struct Alphabet {
    chars: Vec<char>,
    index: FnvHashMap<char, u8>,
    finalized: bool,
}

impl Alphabet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `c` if it is new, returning its byte. Fails if the
    /// alphabet has already been finalized or is full.
    pub fn observe(&mut self, c: char) -> Result<u8> {
        if let Some(&b) = self.index.get(&c) {
            return Ok(b);
        }
        if self.finalized {
            return Err(AffixError::UnknownAlphabetCharacter(c));
        }
        if self.chars.len() >= 256 {
            return Err(AffixError::AlphabetOverflow);
        }
        let b = self.chars.len() as u8;
        self.chars.push(c);
        self.index.insert(c, b);
        Ok(b)
    }

    /// Encodes `word` to alphabet bytes. In strict mode, or once the
    /// alphabet is finalized, an unknown character is an error instead
    /// of being silently registered.
    pub fn encode(&mut self, word: &str, strict: bool) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(word.len());
        for c in word.chars() {
            match self.index.get(&c) {
                Some(&b) => out.push(b),
                None if strict || self.finalized => {
                    return Err(AffixError::UnknownAlphabetCharacter(c));
                }
                None => out.push(self.observe(c)?),
            }
        }
        Ok(out)
    }

    /// Encodes without ever registering a new character; the counterpart
    /// to `encode(word, true)` for callers that already hold `&self`.
    pub fn try_encode(&self, word: &str) -> Result<Vec<u8>> {
        word.chars()
            .map(|c| {
                self.index
                    .get(&c)
                    .copied()
                    .ok_or(AffixError::UnknownAlphabetCharacter(c))
            })
            .collect()
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| self.chars[b as usize]).collect()
    }

    pub fn decode_byte(&self, b: u8) -> char {
        self.chars[b as usize]
    }

    /// Returns the current cardinality and latches the alphabet: after
    /// this call, encoding an unknown character is always an error,
    /// regardless of the `strict` argument passed to `encode`.
    pub fn finalized_size(&mut self) -> usize {
        self.finalized = true;
        self.chars.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        self.index.contains_key(&c)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn observe_assigns_sequential_bytes() {
        let mut a = Alphabet::new();
        assert_eq!(a.observe('a').unwrap(), 0);
        assert_eq!(a.observe('b').unwrap(), 1);
        assert_eq!(a.observe('a').unwrap(), 0);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut a = Alphabet::new();
        let bytes = a.encode("caba", false).unwrap();
        assert_eq!(a.decode(&bytes), "caba");
    }

    #[test]
    fn strict_encode_rejects_unknown() {
        let mut a = Alphabet::new();
        a.encode("ab", false).unwrap();
        assert!(matches!(
            a.encode("abc", true),
            Err(AffixError::UnknownAlphabetCharacter('c'))
        ));
        // the failed strict encode must not have registered 'c'
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn finalize_latches_against_new_chars_even_non_strict() {
        let mut a = Alphabet::new();
        a.encode("ab", false).unwrap();
        assert_eq!(a.finalized_size(), 2);
        assert!(matches!(
            a.encode("abc", false),
            Err(AffixError::UnknownAlphabetCharacter('c'))
        ));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn overflow_past_256_distinct_characters() {
        let mut a = Alphabet::new();
        for i in 0..256u32 {
            let c = char::from_u32(0x3040 + i).unwrap();
            a.observe(c).unwrap();
        }
        let one_too_many = char::from_u32(0x3040 + 256).unwrap();
        assert!(matches!(
            a.observe(one_too_many),
            Err(AffixError::AlphabetOverflow)
        ));
    }
}
