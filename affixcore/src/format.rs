//! Line-oriented readers and writers for the external word-list formats
//! this crate converts to and from: Hunspell's own `.dic` shape, a
//! plain one-word-per-line `.txt`, and comma/pipe-delimited `.csv`.
//!
//! None of this is part of the affix engine itself — `hunaftool` is the
//! only caller — but it's thin enough, and used by exactly one binary
//! closely enough, that it lives alongside the engine rather than as a
//! separate crate.

use std::collections::BTreeSet;

use crate::compress::CompressedEntry;
use crate::diagnostics::Diagnostics;
use crate::flagset::FlagTable;

/// One parsed line of a `.dic` file: a stem plus whatever flags its
/// flag field named. Flags the affix file never declared are already
/// warned-and-dropped by [`FlagTable::lookup_field`]; morphology tokens
/// trailing the flag field (separated from it by whitespace) are
/// discarded entirely.
#[derive(Clone, Debug)]
pub struct DicEntry {
    pub stem: String,
    pub flags: crate::flagset::FlagSet,
}

fn split_dic_line(line: &str) -> (&str, Option<&str>) {
    let field = line.split_whitespace().next().unwrap_or("");
    match field.split_once('/') {
        Some((stem, flag_field)) => (stem, Some(flag_field)),
        None => (field, None),
    }
}

/// Parses the text of a `.dic` file. The leading count line is
/// advisory: a missing or wrong count only produces a diagnostic, never
/// an error, matching Hunspell's own tolerance for stale counts.
pub fn read_dic(text: &str, flags: &FlagTable, diagnostics: &mut Diagnostics) -> Vec<DicEntry> {
    let mut lines = text.lines().enumerate();
    let mut entries = Vec::new();

    let declared_count = match lines.next() {
        Some((_, first)) => match first.trim().parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                diagnostics.warn_at(1, format!("expected an entry count, found {:?}", first));
                None
            }
        },
        None => None,
    };

    for (i, line) in lines {
        let lineno = i + 1;
        if line.trim().is_empty() {
            diagnostics.warn_at(lineno, "empty line in dictionary file");
            continue;
        }
        let (stem, flag_field) = split_dic_line(line);
        let fs = match flag_field {
            Some(f) => flags.set_from_ids(flags.lookup_field(f, diagnostics)),
            None => flags.empty_set(),
        };
        entries.push(DicEntry {
            stem: stem.to_string(),
            flags: fs,
        });
    }

    if let Some(expected) = declared_count {
        if expected != entries.len() {
            diagnostics.warn(format!(
                "declared count {} does not match {} entries actually read",
                expected,
                entries.len()
            ));
        }
    }

    entries
}

/// Renders a compressed dictionary (from [`crate::compress::compress`])
/// in `.dic` form: a count line followed by `stem[/flags]` entries
/// sorted by stem.
pub fn write_dic(entries: &[CompressedEntry], flags: &FlagTable) -> String {
    let mut sorted: Vec<&CompressedEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.stem.cmp(&b.stem));

    let mut out = String::new();
    out.push_str(&sorted.len().to_string());
    out.push('\n');
    for entry in sorted {
        out.push_str(&entry.stem);
        if !entry.flags.is_empty() {
            out.push('/');
            out.push_str(&flags.to_string(&entry.flags));
        }
        out.push('\n');
    }
    out
}

/// Parses a plain one-word-per-line word list. `#`-prefixed lines are
/// comments; blank lines are silently skipped (unlike `.dic`, there's
/// no count line to be inconsistent with).
pub fn read_txt(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn write_txt(words: &BTreeSet<String>) -> String {
    let mut out = String::new();
    for w in words {
        out.push_str(w);
        out.push('\n');
    }
    out
}

/// Parses a `.csv` word list: each line is split on `,` or `|`, and
/// every resulting token is trimmed and treated as an independent word.
pub fn read_csv(text: &str) -> BTreeSet<String> {
    text.lines()
        .flat_map(|line| line.split([',', '|']))
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn write_csv(words: &BTreeSet<String>) -> String {
    let joined = words.iter().cloned().collect::<Vec<_>>().join(",");
    let mut out = joined;
    out.push('\n');
    out
}
