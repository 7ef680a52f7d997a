//! A single `PFX`/`SFX` rule and the indexed collection of all of them.

use crate::alphabet::Alphabet;
use crate::condition::AffixCondition;
use crate::error::Result;
use crate::flagset::FlagSet;
use crate::trie::{PrefixTrie, SuffixTrie};

pub type RuleId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Prefix,
    Suffix,
}

#[derive(Clone, Debug)]
pub struct Rule {
    pub id: RuleId,
    pub kind: Kind,
    pub flag: u32,
    pub cross_product: bool,
    pub strip: String,
    pub append: String,
    pub condition_text: String,
    pub condition: AffixCondition,
    /// Flags the derived word carries in addition to `flag` itself —
    /// the `/flags` suffix on the append field, letting a second round
    /// of suffixing apply on top of this one.
    pub continuation: FlagSet,
}

impl Rule {
    /// Whether this rule's literal `strip` and condition hold against
    /// `stem`. The condition is checked against the full, unstripped
    /// stem: since `strip` is required to already be a literal suffix
    /// (or prefix) of `stem`, matching the un-pruned condition there is
    /// equivalent to matching a pruned condition against the remainder,
    /// just without mutating the rule's stored condition per call.
    pub fn stem_matches(&self, stem: &str) -> bool {
        match self.kind {
            Kind::Suffix => {
                stem.ends_with(self.strip.as_str()) && self.condition.suffix_match(stem)
            }
            Kind::Prefix => {
                stem.starts_with(self.strip.as_str()) && self.condition.prefix_match(stem)
            }
        }
    }

    /// Whether applying this rule to `stem` would strip the whole stem
    /// away before `append` is added back — allowed only when the affix
    /// file declares `FULLSTRIP`.
    pub fn strips_entire_stem(&self, stem: &str) -> bool {
        stem.len() == self.strip.len()
    }

    /// Produces the derived word. Caller must have already confirmed
    /// `stem_matches`.
    pub fn apply(&self, stem: &str) -> String {
        match self.kind {
            Kind::Suffix => {
                let base = &stem[..stem.len() - self.strip.len()];
                format!("{}{}", base, self.append)
            }
            Kind::Prefix => {
                let base = &stem[self.strip.len()..];
                format!("{}{}", self.append, base)
            }
        }
    }

    /// Whether `word` carries this rule's literal `append` at the
    /// appropriate end, making it a candidate for reversal.
    pub fn word_matches(&self, word: &str) -> bool {
        match self.kind {
            Kind::Suffix => word.ends_with(self.append.as_str()),
            Kind::Prefix => word.starts_with(self.append.as_str()),
        }
    }

    /// Reconstructs the stem `word` would have had before this rule
    /// applied, returning `None` if the append doesn't literally match
    /// or the reconstructed stem fails the condition.
    pub fn reverse_apply(&self, word: &str) -> Option<String> {
        if !self.word_matches(word) {
            return None;
        }
        let stem = match self.kind {
            Kind::Suffix => {
                format!("{}{}", &word[..word.len() - self.append.len()], self.strip)
            }
            Kind::Prefix => format!("{}{}", self.strip, &word[self.append.len()..]),
        };
        let ok = match self.kind {
            Kind::Suffix => self.condition.suffix_match(&stem),
            Kind::Prefix => self.condition.prefix_match(&stem),
        };
        ok.then_some(stem)
    }
}

/// The four tries described by the loader: {prefix,suffix} x
/// {from-stem,to-stem}. The from-stem tries are keyed by literal
/// `strip` bytes and drive expansion (stem -> word); the to-stem tries
/// are keyed by literal `append` bytes and drive compression
/// (word -> candidate stem).
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    prefix_from_stem: PrefixTrie<RuleId>,
    suffix_from_stem: SuffixTrie<RuleId>,
    prefix_to_stem: PrefixTrie<RuleId>,
    suffix_to_stem: SuffixTrie<RuleId>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut rule: Rule, alphabet: &Alphabet) -> Result<RuleId> {
        let id = self.rules.len() as RuleId;
        rule.id = id;
        let strip_bytes = alphabet.try_encode(&rule.strip)?;
        let append_bytes = alphabet.try_encode(&rule.append)?;
        match rule.kind {
            Kind::Prefix => {
                self.prefix_from_stem.insert(&strip_bytes, id);
                self.prefix_to_stem.insert(&append_bytes, id);
            }
            Kind::Suffix => {
                self.suffix_from_stem.insert(&strip_bytes, id);
                self.suffix_to_stem.insert(&append_bytes, id);
            }
        }
        self.rules.push(rule);
        Ok(id)
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id as usize]
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn prefix_candidates_for_stem(&self, stem_bytes: &[u8]) -> Vec<RuleId> {
        let mut v = Vec::new();
        self.prefix_from_stem.lookup(stem_bytes, |id| {
            v.push(id);
            false
        });
        v
    }

    pub fn suffix_candidates_for_stem(&self, stem_bytes: &[u8]) -> Vec<RuleId> {
        let mut v = Vec::new();
        self.suffix_from_stem.lookup(stem_bytes, |id| {
            v.push(id);
            false
        });
        v
    }

    pub fn prefix_candidates_for_word(&self, word_bytes: &[u8]) -> Vec<RuleId> {
        let mut v = Vec::new();
        self.prefix_to_stem.lookup(word_bytes, |id| {
            v.push(id);
            false
        });
        v
    }

    pub fn suffix_candidates_for_word(&self, word_bytes: &[u8]) -> Vec<RuleId> {
        let mut v = Vec::new();
        self.suffix_to_stem.lookup(word_bytes, |id| {
            v.push(id);
            false
        });
        v
    }
}
