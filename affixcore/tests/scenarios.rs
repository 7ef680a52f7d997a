//! End-to-end scenarios against literal AFF/DIC text, covering the
//! prefix/suffix composition patterns the affix engine has to get
//! right: cross products, suffix-before-prefix chaining, FULLSTRIP,
//! NEEDAFFIX virtual stems, two-level suffixing, and the long/num
//! flag encodings.

use std::collections::BTreeSet;

use affixcore::diagnostics::Diagnostics;
use affixcore::expand::expand_stem;
use affixcore::flagset::FlagSet;
use affixcore::AffixFile;

/// Parses `aff_text` and seeds the alphabet with every character in
/// `dic_text`, mirroring what `hunaftool`'s single retry does once a
/// stem's characters turn out not to already be registered by the AFF
/// file's own strip/append fields.
fn load(aff_text: &str, dic_text: &str) -> AffixFile {
    let mut diag = Diagnostics::new();
    let mut aff = AffixFile::parse(aff_text, &mut diag).unwrap();
    for c in dic_text.chars() {
        aff.alphabet.observe(c).unwrap();
    }
    aff
}

fn flags_for(aff: &AffixFile, field: &str) -> FlagSet {
    let mut diag = Diagnostics::new();
    aff.flags
        .set_from_ids(aff.flags.lookup_field(field, &mut diag))
}

fn expand(aff: &AffixFile, stem: &str, field: &str) -> BTreeSet<String> {
    let flags = flags_for(aff, field);
    expand_stem(
        stem,
        &flags,
        &aff.alphabet,
        &aff.rules,
        aff.need_affix,
        aff.fullstrip,
    )
    .unwrap()
}

fn words(ws: &[&str]) -> BTreeSet<String> {
    ws.iter().map(|s| s.to_string()).collect()
}

#[test]
fn s1_basic_cross_product() {
    let aff_text = "SET UTF-8\nPFX A Y 1\nPFX A ааа ба ааа\nSFX B Y 1\nSFX B ааа ав ааа\n";
    let aff = load(aff_text, "ааааа");
    let result = expand(&aff, "ааааа", "AB");
    assert_eq!(result, words(&["ааааа", "ааав", "бааа", "бав"]));
}

#[test]
fn s2_suffix_before_prefix_chaining() {
    let aff_text =
        "SET UTF-8\nPFX A Y 1\nPFX A аая бю аая\nSFX B Y 1\nSFX B ааа яв ааа\n";
    let aff = load(aff_text, "ааааа");
    let result = expand(&aff, "ааааа", "AB");
    assert_eq!(result, words(&["ааааа", "ааяв", "бюв"]));
}

#[test]
fn s3_fullstrip_unlocks_full_word_prefix() {
    let aff_text = "\
SET UTF-8
FULLSTRIP
PFX A Y 2
PFX A лыжка сьвіньня лыжка
PFX A лыж шчот лыж
SFX B Y 1
SFX B екар ыжка лекар
";
    let aff = load(aff_text, "лекарлыжкасьвіньняшчотка");
    let result = expand(&aff, "лекар", "AB");
    assert_eq!(
        result,
        words(&["лекар", "лыжка", "сьвіньня", "шчотка"])
    );
}

#[test]
fn s4_needaffix_virtual_stem_suppresses_bare_form() {
    let aff_text = "\
SET UTF-8
FULLSTRIP
NEEDAFFIX z
PFX A Y 2
PFX A лыжка сьвіньня лыжка
PFX A лыж шчот лыж
SFX B Y 1
SFX B екар ыжка лекар
";
    let aff = load(aff_text, "лекарлыжкасьвіньняшчотка");
    let result = expand(&aff, "лекар", "ABz");
    assert!(!result.contains("лекар"), "virtual stem must not be emitted bare");
    assert!(result.contains("лыжка"));
    assert!(result.contains("шчотка"));
}

#[test]
fn s5_two_level_suffix_with_continuation() {
    let aff_text = "\
SET UTF-8
PFX X Y 1
PFX X аая бю ааяр
SFX Y Y 1
SFX Y ааа яв/Z ааа
SFX Z Y 1
SFX Z в ргер в
";
    let aff = load(aff_text, "ааааа");
    let result = expand(&aff, "ааааа", "XY");
    assert!(result.contains("ааааа"));
    assert!(result.contains("ааяв"));
    assert!(result.contains("ааяргер"));
    assert!(result.contains("бюргер"));
}

#[test]
fn s6_long_flags_match_s1() {
    let aff_text =
        "SET UTF-8\nFLAG long\nPFX Aa Y 1\nPFX Aa ааа ба ааа\nSFX Bb Y 1\nSFX Bb ааа ав ааа\n";
    let aff = load(aff_text, "ааааа");
    let result = expand(&aff, "ааааа", "AaBb");
    assert_eq!(result, words(&["ааааа", "ааав", "бааа", "бав"]));
}

#[test]
fn s7_num_flags_match_s1() {
    let aff_text =
        "SET UTF-8\nFLAG num\nPFX 1 Y 1\nPFX 1 ааа ба ааа\nSFX 2 Y 1\nSFX 2 ааа ав ааа\n";
    let aff = load(aff_text, "ааааа");
    let result = expand(&aff, "ааааа", "1,2");
    assert_eq!(result, words(&["ааааа", "ааав", "бааа", "бав"]));
}

/// Invariant 2 from the universal-properties list: expanding a
/// compressed dictionary reproduces the original word set exactly.
#[test]
fn round_trip_through_compression_and_expansion() {
    use affixcore::compress::compress;
    use affixcore::format;

    let aff_text = "SET UTF-8\nSFX S Y 1\nSFX S 0 s .\nSFX T Y 1\nSFX T 0 ed .\n";
    let words_in: BTreeSet<String> = [
        "walk", "walks", "walked", "jump", "jumps", "jumped", "cat",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let mut diag = Diagnostics::new();
    let mut aff = AffixFile::parse(aff_text, &mut diag).unwrap();
    for w in &words_in {
        for c in w.chars() {
            aff.alphabet.observe(c).unwrap();
        }
    }

    let report = compress(&words_in, &aff).unwrap();

    let mut reexpanded: BTreeSet<String> = BTreeSet::new();
    for entry in &report.entries {
        affixcore::expand::expand_stem_into(
            &entry.stem,
            &entry.flags,
            &aff.alphabet,
            &aff.rules,
            aff.need_affix,
            aff.fullstrip,
            &mut reexpanded,
        )
        .unwrap();
    }
    assert_eq!(reexpanded, words_in);

    // The round trip also has to survive the external DIC text form.
    let dic_text = format::write_dic(&report.entries, &aff.flags);
    let mut diag2 = Diagnostics::new();
    let parsed_back = format::read_dic(&dic_text, &aff.flags, &mut diag2);
    assert!(diag2.is_empty());
    let mut reexpanded2: BTreeSet<String> = BTreeSet::new();
    for entry in &parsed_back {
        affixcore::expand::expand_stem_into(
            &entry.stem,
            &entry.flags,
            &aff.alphabet,
            &aff.rules,
            aff.need_affix,
            aff.fullstrip,
            &mut reexpanded2,
        )
        .unwrap();
    }
    assert_eq!(reexpanded2, words_in);
}

/// Mirrors `s5_two_level_suffix_with_continuation` but through
/// `compress()` instead of `expand_stem`: the four surface forms are fed
/// in as a flat word list, and compression has to walk back through both
/// suffix levels (`SFX Z` chained off `SFX Y`'s continuation flag) and
/// the prefix to land on the single deepest stem, even though the
/// intermediate form "ааяв" is never given to `compress` on its own.
#[test]
fn compress_reconstructs_deepest_stem_through_two_level_suffix_chain() {
    use affixcore::compress::compress;

    let aff_text = "\
SET UTF-8
PFX X Y 1
PFX X аая бю ааяр
SFX Y Y 1
SFX Y ааа яв/Z ааа
SFX Z Y 1
SFX Z в ргер в
";
    let aff_for_words = load(aff_text, "ааааа");
    let words_in = expand(&aff_for_words, "ааааа", "XY");
    assert_eq!(words_in.len(), 4);

    let mut diag = Diagnostics::new();
    let mut aff = AffixFile::parse(aff_text, &mut diag).unwrap();
    for w in &words_in {
        for c in w.chars() {
            aff.alphabet.observe(c).unwrap();
        }
    }

    let report = compress(&words_in, &aff).unwrap();
    assert!(report.remainder.is_empty());
    assert!(
        report.entries.len() < words_in.len(),
        "the four surface forms should collapse into fewer entries"
    );
    assert!(report.entries.iter().any(|e| e.stem == "ааааа"));

    let mut reexpanded: BTreeSet<String> = BTreeSet::new();
    for entry in &report.entries {
        affixcore::expand::expand_stem_into(
            &entry.stem,
            &entry.flags,
            &aff.alphabet,
            &aff.rules,
            aff.need_affix,
            aff.fullstrip,
            &mut reexpanded,
        )
        .unwrap();
    }
    assert_eq!(reexpanded, words_in);
}

/// Invariant 3: compressing an already-expanded dictionary never grows
/// the entry count, and strictly shrinks it whenever a shared affix
/// exists.
#[test]
fn compression_never_grows_the_dictionary() {
    use affixcore::compress::compress;

    let aff_text = "SET UTF-8\nSFX S Y 1\nSFX S 0 s .\n";
    let words_in: BTreeSet<String> = ["cat", "cats"].into_iter().map(String::from).collect();

    let mut diag = Diagnostics::new();
    let mut aff = AffixFile::parse(aff_text, &mut diag).unwrap();
    for w in &words_in {
        for c in w.chars() {
            aff.alphabet.observe(c).unwrap();
        }
    }

    let report = compress(&words_in, &aff).unwrap();
    assert!(report.entries.len() < words_in.len());
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].stem, "cat");
}
