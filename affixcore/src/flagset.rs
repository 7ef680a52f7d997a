//! Flags name the affix rules that apply to a stem. Hunspell encodes
//! them three different ways depending on `FLAG` in the AFF header:
//! a single UTF-8 character, two ASCII characters ("long"), or a
//! decimal number. [`FlagTable`] is the registry that turns whichever
//! textual form is in play into small dense integers, and [`FlagSet`]
//! is the set-of-flags type everything else in the crate passes around.
//!
//! A flag set is represented as a 64-bit bitmask while the table has
//! fewer than 63 registered flags, and as a hashed set of positions
//! once it grows past that — the switch is purely a space/speed
//! tradeoff and both representations are expected to agree on every
//! operation (see the `proptest` suite in this module).

use fnv::FnvHashSet;

use crate::diagnostics::Diagnostics;
use crate::error::{AffixError, Result};

const BITSET_THRESHOLD: usize = 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagMode {
    /// `FLAG UTF-8` (the default): one flag per character.
    Char,
    /// `FLAG long`: two ASCII characters per flag.
    Long,
    /// `FLAG num`: a comma-separated list of decimal numbers.
    Num,
}

impl Default for FlagMode {
    fn default() -> Self {
        FlagMode::Char
    }
}

/// The registry mapping a flag's textual spelling (in whichever mode
/// the AFF file declared) to a dense integer id.
#[derive(Clone, Debug, Default)]
pub struct FlagTable {
    mode: FlagMode,
    names: Vec<String>,
    index: fnv::FnvHashMap<String, u32>,
}

impl FlagTable {
    pub fn new(mode: FlagMode) -> Self {
        FlagTable {
            mode,
            names: Vec::new(),
            index: Default::default(),
        }
    }

    pub fn mode(&self) -> FlagMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    /// Whether sets built from this table should use the bitset or the
    /// hashed representation, per the 63-flag threshold.
    pub fn representation(&self) -> Repr {
        if self.names.len() < BITSET_THRESHOLD {
            Repr::Bits
        } else {
            Repr::Hashed
        }
    }

    pub fn empty_set(&self) -> FlagSet {
        match self.representation() {
            Repr::Bits => FlagSet::Bits(0),
            Repr::Hashed => FlagSet::Hashed(FnvHashSet::default()),
        }
    }

    fn validate_token(&self, token: &str) -> Result<()> {
        match self.mode {
            FlagMode::Char => {
                if token.chars().count() != 1 {
                    return Err(AffixError::MalformedAff {
                        line: 0,
                        message: format!("flag {:?} is not a single UTF-8 character", token),
                    });
                }
            }
            FlagMode::Long => {
                if token.len() != 2 || !token.is_ascii() {
                    return Err(AffixError::MalformedAff {
                        line: 0,
                        message: format!("flag {:?} is not two ASCII characters", token),
                    });
                }
            }
            FlagMode::Num => {
                let n: u32 = token.parse().map_err(|_| AffixError::MalformedAff {
                    line: 0,
                    message: format!("flag {:?} is not a decimal number", token),
                })?;
                if n == 0 || n >= 65510 {
                    return Err(AffixError::MalformedAff {
                        line: 0,
                        message: format!("flag number {} out of range", n),
                    });
                }
            }
        }
        Ok(())
    }

    /// Registers a single flag token, assigning it a new id if unseen.
    pub fn register(&mut self, token: &str) -> Result<u32> {
        if let Some(&id) = self.index.get(token) {
            return Ok(id);
        }
        self.validate_token(token)?;
        let id = self.names.len() as u32;
        self.names.push(token.to_string());
        self.index.insert(token.to_string(), id);
        Ok(id)
    }

    /// Splits `field` into tokens the way this table's mode demands,
    /// registering any flag not yet seen. Used while loading the AFF
    /// file itself (rule headers, `NEEDAFFIX`, continuation flags on
    /// affix data lines) where every flag mentioned is by definition
    /// legitimate.
    pub fn register_field(&mut self, field: &str, diagnostics: &mut Diagnostics) -> Result<Vec<u32>> {
        self.split(field, diagnostics)
            .into_iter()
            .map(|tok| self.register(&tok))
            .collect()
    }

    /// Splits `field` and looks up each token, without registering new
    /// ones. Used for dictionary entries: a flag a DIC line mentions
    /// that the AFF file never declared is a warn-and-skip, not an
    /// error.
    pub fn lookup_field(&self, field: &str, diagnostics: &mut Diagnostics) -> Vec<u32> {
        self.split(field, diagnostics)
            .into_iter()
            .filter_map(|tok| match self.index.get(&tok) {
                Some(&id) => Some(id),
                None => {
                    diagnostics.warn(format!("ignoring undeclared flag {:?}", tok));
                    None
                }
            })
            .collect()
    }

    /// Splits a flag field into its per-flag tokens. In `long` mode this
    /// consumes two *code points* at a time, not two bytes — an odd
    /// number of characters is a warning, with the final, unpaired
    /// character dropped rather than silently truncated without a trace.
    fn split(&self, field: &str, diagnostics: &mut Diagnostics) -> Vec<String> {
        let field = field.trim();
        if field.is_empty() {
            return Vec::new();
        }
        match self.mode {
            FlagMode::Char => field.chars().map(|c| c.to_string()).collect(),
            FlagMode::Long => {
                let chars: Vec<char> = field.chars().collect();
                if chars.len() % 2 != 0 {
                    diagnostics.warn(format!(
                        "long-mode flag field {:?} has an odd number of characters",
                        field
                    ));
                }
                chars.chunks(2).map(|pair| pair.iter().collect()).collect()
            }
            FlagMode::Num => field.split(',').map(|s| s.trim().to_string()).collect(),
        }
    }

    pub fn set_from_ids(&self, ids: impl IntoIterator<Item = u32>) -> FlagSet {
        let mut set = self.empty_set();
        for id in ids {
            set.insert(id);
        }
        set
    }

    /// Stringifies `set` in ascending bit-position order regardless of
    /// which internal representation it happens to use — the hashed
    /// representation's iteration order is arbitrary, so this always
    /// sorts the ids first.
    pub fn to_string(&self, set: &FlagSet) -> String {
        let sep = if self.mode == FlagMode::Num { "," } else { "" };
        let mut ids: Vec<u32> = set.iter().collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|id| self.name(id).to_string())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repr {
    Bits,
    Hashed,
}

/// A set of flag ids, in one of two interchangeable representations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagSet {
    Bits(u64),
    Hashed(FnvHashSet<u32>),
}

impl Default for FlagSet {
    fn default() -> Self {
        FlagSet::Bits(0)
    }
}

impl FlagSet {
    pub fn bits() -> Self {
        FlagSet::Bits(0)
    }

    pub fn hashed() -> Self {
        FlagSet::Hashed(FnvHashSet::default())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FlagSet::Bits(b) => *b == 0,
            FlagSet::Hashed(s) => s.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FlagSet::Bits(b) => b.count_ones() as usize,
            FlagSet::Hashed(s) => s.len(),
        }
    }

    pub fn contains(&self, flag: u32) -> bool {
        match self {
            FlagSet::Bits(b) => flag < 64 && (b & (1u64 << flag)) != 0,
            FlagSet::Hashed(s) => s.contains(&flag),
        }
    }

    pub fn insert(&mut self, flag: u32) {
        match self {
            FlagSet::Bits(b) => {
                debug_assert!(flag < 64, "flag id {} too large for bitset repr", flag);
                *b |= 1u64 << flag;
            }
            FlagSet::Hashed(s) => {
                s.insert(flag);
            }
        }
    }

    pub fn remove(&mut self, flag: u32) {
        match self {
            FlagSet::Bits(b) => {
                if flag < 64 {
                    *b &= !(1u64 << flag);
                }
            }
            FlagSet::Hashed(s) => {
                s.remove(&flag);
            }
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            FlagSet::Bits(b) => Box::new((0..64u32).filter(move |i| (b & (1u64 << i)) != 0)),
            FlagSet::Hashed(s) => Box::new(s.iter().copied()),
        }
    }

    pub fn intersects(&self, other: &FlagSet) -> bool {
        match (self, other) {
            (FlagSet::Bits(a), FlagSet::Bits(b)) => (a & b) != 0,
            (FlagSet::Hashed(a), FlagSet::Hashed(b)) => a.intersection(b).next().is_some(),
            _ => self.iter().any(|f| other.contains(f)),
        }
    }

    pub fn merge(&self, other: &FlagSet) -> FlagSet {
        match (self, other) {
            (FlagSet::Bits(a), FlagSet::Bits(b)) => FlagSet::Bits(a | b),
            (FlagSet::Hashed(a), FlagSet::Hashed(b)) => {
                FlagSet::Hashed(a.union(b).copied().collect())
            }
            _ => {
                let mut out = self.clone();
                for f in other.iter() {
                    out.insert(f);
                }
                out
            }
        }
    }

    pub fn subtract(&self, other: &FlagSet) -> FlagSet {
        match (self, other) {
            (FlagSet::Bits(a), FlagSet::Bits(b)) => FlagSet::Bits(a & !b),
            (FlagSet::Hashed(a), FlagSet::Hashed(b)) => {
                FlagSet::Hashed(a.difference(b).copied().collect())
            }
            _ => {
                let mut out = self.clone();
                for f in other.iter() {
                    out.remove(f);
                }
                out
            }
        }
    }
}
