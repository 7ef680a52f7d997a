//! Turns one dictionary entry (a stem plus the flags attached to it)
//! into the full set of surface words it stands for: the bare stem
//! itself (unless it's a virtual stem marked `NEEDAFFIX`), every
//! single prefix or suffix application, second-level suffixing through
//! a rule's continuation flags, and the cross product of a prefix and
//! a suffix that both allow it — optionally extended by one more
//! continuation suffix on top of that cross form.
//!
//! Candidate rules are found by walking the *from-stem* tries (keyed by
//! each rule's literal `strip` bytes) rather than scanning every rule in
//! the set; the condition and flag checks that decide whether a
//! candidate actually applies happen afterwards, in [`may_apply`].

use std::collections::BTreeSet;

use crate::alphabet::Alphabet;
use crate::error::Result;
use crate::flagset::FlagSet;
use crate::rule::{Rule, RuleSet};

fn is_virtual(flags: &FlagSet, need_affix: Option<u32>) -> bool {
    need_affix.map_or(false, |f| flags.contains(f))
}

/// Whether `rule` may be applied to `word` at all: it must structurally
/// match, and — unless `fullstrip` is declared — it must not strip the
/// word away entirely before `append` is added back.
fn may_apply(rule: &Rule, word: &str, fullstrip: bool) -> bool {
    rule.stem_matches(word) && (fullstrip || !rule.strips_entire_stem(word))
}

fn prefix_rules_for<'a>(
    alphabet: &Alphabet,
    rules: &'a RuleSet,
    word: &str,
    flags: &FlagSet,
) -> Result<Vec<&'a Rule>> {
    let bytes = alphabet.try_encode(word)?;
    Ok(rules
        .prefix_candidates_for_stem(&bytes)
        .into_iter()
        .map(|id| rules.rule(id))
        .filter(|r| flags.contains(r.flag))
        .collect())
}

fn suffix_rules_for<'a>(
    alphabet: &Alphabet,
    rules: &'a RuleSet,
    word: &str,
    flags: &FlagSet,
) -> Result<Vec<&'a Rule>> {
    let bytes = alphabet.try_encode(word)?;
    Ok(rules
        .suffix_candidates_for_stem(&bytes)
        .into_iter()
        .map(|id| rules.rule(id))
        .filter(|r| flags.contains(r.flag))
        .collect())
}

/// Expands a single `(stem, flags)` dictionary entry into its surface
/// words, inserting them into `out`. `need_affix` is the flag id (if
/// any) that marks a stem as virtual — present only to license
/// affixation, never a word on its own. `fullstrip` mirrors the affix
/// file's `FULLSTRIP` directive: without it, a rule that would strip a
/// word down to nothing before appending is simply skipped.
///
/// Fails with `UnknownAlphabetCharacter` if `stem` (or a word derived
/// from it) contains a character the affix file's alphabet has never
/// seen; the caller is expected to retry once after seeding the
/// alphabet from the word list itself (see the `hunaftool` driver).
pub fn expand_stem_into(
    stem: &str,
    flags: &FlagSet,
    alphabet: &Alphabet,
    rules: &RuleSet,
    need_affix: Option<u32>,
    fullstrip: bool,
    out: &mut BTreeSet<String>,
) -> Result<()> {
    if !is_virtual(flags, need_affix) {
        out.insert(stem.to_string());
    }

    let prefixes = prefix_rules_for(alphabet, rules, stem, flags)?;
    let suffixes = suffix_rules_for(alphabet, rules, stem, flags)?;

    // Prefix applied directly to the stem.
    for p in prefixes.iter().filter(|p| may_apply(p, stem, fullstrip)) {
        out.insert(p.apply(stem));
    }

    for s1 in suffixes.iter().filter(|s| may_apply(s, stem, fullstrip)) {
        let w1 = s1.apply(stem);
        if !is_virtual(&s1.continuation, need_affix) {
            out.insert(w1.clone());
        }

        // Suffix-then-prefix cross product: the prefix is checked
        // against the *suffixed* form, not the original stem — Hunspell
        // applies the suffix first and then tries prefixes on the
        // rewritten word. `w1` is built only from `stem`'s and the
        // rule's own already-registered characters, so this encode
        // cannot fail.
        if s1.cross_product {
            let cross_prefixes = prefix_rules_for(alphabet, rules, &w1, flags)?;
            for p in cross_prefixes
                .iter()
                .filter(|p| p.cross_product && may_apply(p, &w1, fullstrip))
            {
                out.insert(p.apply(&w1));
            }
        }

        // Second suffix level, gated by the first suffix's continuation
        // flags rather than the dictionary entry's own flags.
        let second_level = suffix_rules_for(alphabet, rules, &w1, &s1.continuation)?;
        for s2 in second_level.iter().filter(|r| may_apply(r, &w1, fullstrip)) {
            let w2 = s2.apply(&w1);
            out.insert(w2.clone());

            if s1.cross_product && s2.cross_product {
                let combined_flags = flags.merge(&s1.continuation);
                let cross_prefixes = prefix_rules_for(alphabet, rules, &w2, &combined_flags)?;
                for p in cross_prefixes
                    .iter()
                    .filter(|p| p.cross_product && may_apply(p, &w2, fullstrip))
                {
                    out.insert(p.apply(&w2));
                }
            }
        }
    }

    Ok(())
}

/// Convenience wrapper returning a fresh set instead of writing into one.
pub fn expand_stem(
    stem: &str,
    flags: &FlagSet,
    alphabet: &Alphabet,
    rules: &RuleSet,
    need_affix: Option<u32>,
    fullstrip: bool,
) -> Result<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    expand_stem_into(stem, flags, alphabet, rules, need_affix, fullstrip, &mut out)?;
    Ok(out)
}
