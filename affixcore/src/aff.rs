//! Loader for Hunspell `.aff` files.
//!
//! Parsing happens in three passes over one line-by-line tokenization:
//! first a quick scan fixes the flag mode (`FLAG` directive, defaulting
//! to single-character UTF-8 flags), then a registration pass walks
//! every line once to assign every flag mentioned anywhere — rule
//! headers, `NEEDAFFIX`, and any `/flags` continuation on a rule's data
//! line — a stable id, and finally a build pass turns `PFX`/`SFX` data
//! lines into [`Rule`]s and inserts them into the [`RuleSet`]'s tries.
//! Splitting registration from construction means a continuation flag
//! that never gets its own rule block is still a known flag by the time
//! the rule referencing it is built, regardless of line order.
//!
//! A line that doesn't match any recognized directive shape is not a
//! fatal error: it's recorded in [`Diagnostics`] and skipped, so one bad
//! line doesn't take down the rest of the file.
//!
//! The build pass also tracks which header's block a data row belongs
//! to (`ActiveBlock`): a row whose own `kind`/`flag` doesn't match the
//! header that opened the block it falls under is a warn-and-skip, not
//! a silent `cross_product` lookup keyed on the row's own flag alone.

use fnv::FnvHashMap;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{char, not_line_ending, space0, space1, u32 as parse_u32};
use nom::combinator::{cut, eof, map, opt, success, value};
use nom::error::{ErrorKind, ParseError};
use nom::sequence::{delimited, preceded};
use nom::{Compare, Err, Finish, IResult, InputLength, Parser};

use crate::alphabet::Alphabet;
use crate::condition::AffixCondition;
use crate::diagnostics::Diagnostics;
use crate::error::{AffixError, Result};
use crate::flagset::{FlagMode, FlagTable};
use crate::rule::{Kind, Rule, RuleSet};

type Input<'a> = &'a str;

const BYTE_ORDER_MARK: char = '\u{FEFF}';

struct AffError {
    message: String,
}

impl<'a> ParseError<Input<'a>> for AffError {
    fn from_error_kind(input: Input, kind: ErrorKind) -> Self {
        AffError {
            message: format!("{:?}: {}", kind, input),
        }
    }

    fn append(_input: Input, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl ToString for AffError {
    fn to_string(&self) -> String {
        self.message.clone()
    }
}

#[derive(Clone, Copy, Debug)]
enum RawLine<'a> {
    Empty,
    SetEncoding(&'a str),
    SetFlagMode(FlagMode),
    SetTryString(&'a str),
    SetWordChars(&'a str),
    SetBreakChars(&'a str),
    SetFullStrip,
    NeedAffix(&'a str),
    AffixHeader {
        kind: Kind,
        flag: &'a str,
        cross_product: &'a str,
        count: u32,
    },
    AffixRow {
        kind: Kind,
        flag: &'a str,
        strip: &'a str,
        append: &'a str,
        flags2: Option<&'a str>,
        condition: &'a str,
    },
}

/// Parses a line starting with a keyword, then a single whitespace
/// delimited value.
fn keyword<'a, T, O, E: ParseError<Input<'a>>, F>(
    key: T,
    mut value: F,
) -> impl FnMut(Input<'a>) -> IResult<Input<'a>, O, E>
where
    F: Parser<Input<'a>, O, E>,
    Input<'a>: Compare<T>,
    T: InputLength + Copy,
{
    move |s: Input<'a>| {
        let (s, _) = tag(key).parse(s)?;
        let (s, _) = space1.parse(s)?;
        match value.parse(s) {
            Err(Err::Error(e)) => Err(Err::Failure(e)),
            rest => rest,
        }
    }
}

fn comment(s: Input) -> IResult<Input, ()> {
    value((), preceded(char('#'), not_line_ending))(s)
}

fn value_string(s: Input) -> IResult<Input, &str, AffError> {
    take_till1(|c: char| c.is_whitespace())(s)
}

fn set_encoding(s: Input) -> IResult<Input, RawLine, AffError> {
    map(keyword("SET", value_string), RawLine::SetEncoding)(s)
}

fn flag_mode(s: Input) -> IResult<Input, FlagMode, AffError> {
    alt((
        value(FlagMode::Long, tag("long")),
        value(FlagMode::Num, tag("num")),
        value(FlagMode::Char, tag("UTF-8")),
    ))(s)
}

fn set_flag_mode(s: Input) -> IResult<Input, RawLine, AffError> {
    map(keyword("FLAG", flag_mode), RawLine::SetFlagMode)(s)
}

fn set_try_string(s: Input) -> IResult<Input, RawLine, AffError> {
    map(keyword("TRY", value_string), RawLine::SetTryString)(s)
}

fn set_word_chars(s: Input) -> IResult<Input, RawLine, AffError> {
    map(keyword("WORDCHARS", value_string), RawLine::SetWordChars)(s)
}

fn set_break_chars(s: Input) -> IResult<Input, RawLine, AffError> {
    map(keyword("BREAK", value_string), RawLine::SetBreakChars)(s)
}

fn set_fullstrip(s: Input) -> IResult<Input, RawLine, AffError> {
    value(RawLine::SetFullStrip, tag("FULLSTRIP"))(s)
}

fn need_affix(s: Input) -> IResult<Input, RawLine, AffError> {
    map(keyword("NEEDAFFIX", value_string), RawLine::NeedAffix)(s)
}

fn affix_kind(s: Input) -> IResult<Input, Kind, AffError> {
    alt((
        value(Kind::Prefix, tag("PFX")),
        value(Kind::Suffix, tag("SFX")),
    ))(s)
}

fn affix_header(s: Input) -> IResult<Input, RawLine, AffError> {
    let (s, kind) = affix_kind(s)?;
    let (s, _) = space1(s)?;
    let (s, flag) = value_string(s)?;
    let (s, _) = space1(s)?;
    let (s, cross_product) = value_string(s)?;
    let (s, _) = space1(s)?;
    let (s, count) = parse_u32(s)?;
    // A header has exactly four fields; if anything but trailing
    // whitespace/comment follows, this was actually a data row whose
    // strip field happened to read "Y" or "N".
    let (s, _) = delimited(space0, opt(comment), eof)(s)?;
    Ok((
        s,
        RawLine::AffixHeader {
            kind,
            flag,
            cross_product,
            count,
        },
    ))
}

fn affix_row(s: Input) -> IResult<Input, RawLine, AffError> {
    let (s, kind) = affix_kind(s)?;
    let (s, _) = space1(s)?;
    let (s, flag) = value_string(s)?;
    let (s, _) = space1(s)?;
    let (s, strip) = value_string(s)?;
    let (s, _) = space1(s)?;
    let (s, append_field) = value_string(s)?;
    let (s, _) = space1(s)?;
    let (s, condition) = cut(value_string)(s)?;
    let (append, flags2) = match append_field.split_once('/') {
        Some((a, f)) => (a, Some(f)),
        None => (append_field, None),
    };
    Ok((
        s,
        RawLine::AffixRow {
            kind,
            flag,
            strip,
            append,
            flags2,
            condition,
        },
    ))
}

fn line_body(s: Input) -> IResult<Input, RawLine, AffError> {
    let (s, result) = alt((
        set_encoding,
        set_flag_mode,
        set_try_string,
        set_word_chars,
        set_break_chars,
        set_fullstrip,
        need_affix,
        affix_header,
        affix_row,
        success(RawLine::Empty),
    ))(s)?;
    let (s, _) = delimited(space0, opt(comment), eof)(s)?;
    Ok((s, result))
}

/// Directives Hunspell's real parser only recognizes at column 0; an
/// indented occurrence is inert, matching the upstream behavior rather
/// than "helpfully" applying it anyway.
const COLUMN_ZERO_ONLY: [&str; 3] = ["FULLSTRIP", "NEEDAFFIX", "FLAG"];

fn parse_lines<'a>(text: &'a str, diagnostics: &mut Diagnostics) -> Vec<(usize, RawLine<'a>)> {
    let mut out = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let lineno = i + 1;
        let raw = raw.strip_prefix(BYTE_ORDER_MARK).unwrap_or(raw);
        if raw != raw.trim_start() {
            let trimmed = raw.trim_start();
            if let Some(keyword) = COLUMN_ZERO_ONLY
                .iter()
                .find(|kw| trimmed.starts_with(*kw))
            {
                diagnostics.warn_at(
                    lineno,
                    format!("indented {} directive is inactive", keyword),
                );
                continue;
            }
        }
        match line_body(raw).finish() {
            Ok((_, parsed)) => out.push((lineno, parsed)),
            Err(e) => diagnostics.warn_at(lineno, format!("unrecognized line: {}", e.to_string())),
        }
    }
    out
}

fn literal(field: &str) -> String {
    if field == "0" {
        String::new()
    } else {
        field.to_string()
    }
}

/// The header currently open while the build pass walks through a
/// `PFX`/`SFX` block's data rows, tracking how many rows remain so the
/// block closes itself once they're consumed.
struct ActiveBlock<'a> {
    kind: Kind,
    flag: &'a str,
    remaining: u32,
}

/// A loaded, ready-to-use affix file: the alphabet seen while loading
/// it, the flag registry, and the indexed rule set.
#[derive(Clone, Debug)]
pub struct AffixFile {
    pub alphabet: Alphabet,
    pub flags: FlagTable,
    pub rules: RuleSet,
    pub need_affix: Option<u32>,
    pub fullstrip: bool,
    pub try_string: Option<String>,
    pub word_chars: Option<String>,
    pub break_chars: Option<String>,
}

/// Reconciles a rule's `condition` field against its literal `strip`
/// field the way Hunspell's own forgiving loader does: a condition that
/// doesn't structurally agree with the strip text is repaired in place
/// where a character-for-character fix is possible, and the rule is
/// dropped entirely (by returning `None`) only when no repair applies.
fn repair_condition(kind: Kind, strip: &str, condition: &str) -> Option<String> {
    if strip.is_empty() {
        return Some(condition.to_string());
    }

    let literally_ok = match kind {
        Kind::Suffix => condition.ends_with(strip),
        Kind::Prefix => condition.starts_with(strip),
    };
    if literally_ok {
        return Some(condition.to_string());
    }

    // The condition's character classes might already accept `strip`
    // even though the literal text differs (e.g. a bracket group at the
    // matching position that happens to include strip's characters).
    let compiled = AffixCondition::new(condition);
    let structurally_ok = match kind {
        Kind::Suffix => compiled.suffix_match(strip),
        Kind::Prefix => compiled.prefix_match(strip),
    };
    if structurally_ok {
        return Some(condition.to_string());
    }

    // Otherwise, try substituting the literal strip text for the
    // corresponding run of characters at the start/end of condition.
    let cond_chars: Vec<char> = condition.chars().collect();
    let strip_len = strip.chars().count();
    if cond_chars.len() < strip_len {
        return None;
    }
    let rewritten: String = match kind {
        Kind::Suffix => {
            let keep = &cond_chars[..cond_chars.len() - strip_len];
            keep.iter().collect::<String>() + strip
        }
        Kind::Prefix => {
            let keep = &cond_chars[strip_len..];
            strip.to_string() + &keep.iter().collect::<String>()
        }
    };
    Some(rewritten)
}

impl AffixFile {
    /// Parses the text of a `.aff` file. Malformed lines and undeclared
    /// continuation flags are reported through `diagnostics` rather
    /// than aborting the load; only an unsupported character-set
    /// declaration or an alphabet overflow stop it outright.
    pub fn parse(text: &str, diagnostics: &mut Diagnostics) -> Result<AffixFile> {
        let lines = parse_lines(text, diagnostics);

        let mode = lines
            .iter()
            .find_map(|(_, l)| match l {
                RawLine::SetFlagMode(m) => Some(*m),
                _ => None,
            })
            .unwrap_or(FlagMode::Char);
        let mut flags = FlagTable::new(mode);

        for (lineno, l) in &lines {
            match *l {
                RawLine::NeedAffix(tok) => {
                    if let Err(e) = flags.register(tok) {
                        diagnostics.warn_at(*lineno, e.to_string());
                    }
                }
                RawLine::AffixHeader { flag, .. } => {
                    if let Err(e) = flags.register(flag) {
                        diagnostics.warn_at(*lineno, e.to_string());
                    }
                }
                RawLine::AffixRow { flag, flags2, .. } => {
                    if let Err(e) = flags.register(flag) {
                        diagnostics.warn_at(*lineno, e.to_string());
                    }
                    if let Some(f2) = flags2 {
                        if let Err(e) = flags.register_field(f2, diagnostics) {
                            diagnostics.warn_at(*lineno, e.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        let mut alphabet = Alphabet::new();
        let mut try_string = None;
        let mut word_chars = None;
        let mut break_chars = None;
        for (_, l) in &lines {
            match *l {
                RawLine::SetTryString(t) => {
                    for c in t.chars() {
                        alphabet.observe(c)?;
                    }
                    try_string = Some(t.to_string());
                }
                RawLine::SetWordChars(t) => {
                    for c in t.chars() {
                        alphabet.observe(c)?;
                    }
                    word_chars = Some(t.to_string());
                }
                RawLine::SetBreakChars(t) => {
                    for c in t.chars() {
                        alphabet.observe(c)?;
                    }
                    break_chars = Some(t.to_string());
                }
                _ => {}
            }
        }

        let mut fullstrip = false;
        let mut need_affix = None;
        let mut cross_product: FnvHashMap<&str, bool> = FnvHashMap::default();
        let mut rules = RuleSet::new();
        let mut active_block: Option<ActiveBlock> = None;

        for (lineno, l) in &lines {
            match *l {
                RawLine::SetEncoding(enc) => {
                    if enc != "UTF-8" {
                        return Err(AffixError::MalformedAff {
                            line: *lineno,
                            message: format!("unsupported encoding {:?}", enc),
                        });
                    }
                }
                RawLine::SetFullStrip => fullstrip = true,
                RawLine::NeedAffix(tok) => {
                    need_affix = flags.register(tok).ok();
                }
                RawLine::AffixHeader {
                    kind,
                    flag,
                    cross_product: cp,
                    count,
                } => {
                    let cp = match cp {
                        "Y" => true,
                        "N" => false,
                        other => {
                            diagnostics.warn_at(
                                *lineno,
                                format!(
                                    "unrecognized cross-product indicator {:?}, defaulting to N",
                                    other
                                ),
                            );
                            false
                        }
                    };
                    cross_product.insert(flag, cp);
                    active_block = if count > 0 {
                        Some(ActiveBlock {
                            kind,
                            flag,
                            remaining: count,
                        })
                    } else {
                        None
                    };
                }
                RawLine::AffixRow {
                    kind,
                    flag,
                    strip,
                    append,
                    flags2,
                    condition,
                } => {
                    match &mut active_block {
                        Some(block) if block.kind == kind && block.flag == flag => {
                            block.remaining -= 1;
                            if block.remaining == 0 {
                                active_block = None;
                            }
                        }
                        Some(block) => {
                            diagnostics.warn_at(
                                *lineno,
                                format!(
                                    "{:?} row for flag {:?} does not match the open {:?} block for flag {:?}; row skipped",
                                    kind, flag, block.kind, block.flag
                                ),
                            );
                            continue;
                        }
                        None => {
                            diagnostics.warn_at(
                                *lineno,
                                format!(
                                    "{:?} row for flag {:?} appears with no open header block; row skipped",
                                    kind, flag
                                ),
                            );
                            continue;
                        }
                    }

                    let flag_id = match flags.register(flag) {
                        Ok(id) => id,
                        Err(e) => {
                            diagnostics.warn_at(*lineno, e.to_string());
                            continue;
                        }
                    };
                    let strip_lit = literal(strip);
                    let append_lit = literal(append);
                    for c in strip_lit.chars().chain(append_lit.chars()) {
                        alphabet.observe(c)?;
                    }
                    let condition_text = if condition == "." {
                        strip_lit.clone()
                    } else {
                        match repair_condition(kind, &strip_lit, condition) {
                            Some(fixed) => {
                                if fixed != condition {
                                    diagnostics.warn_at(
                                        *lineno,
                                        format!(
                                            "condition {:?} did not agree with strip {:?}; rewritten to {:?}",
                                            condition, strip_lit, fixed
                                        ),
                                    );
                                }
                                fixed
                            }
                            None => {
                                diagnostics.warn_at(
                                    *lineno,
                                    format!(
                                        "condition {:?} is incompatible with strip {:?}; rule dropped",
                                        condition, strip_lit
                                    ),
                                );
                                continue;
                            }
                        }
                    };
                    let continuation = match flags2 {
                        Some(f) => flags.set_from_ids(flags.lookup_field(f, diagnostics)),
                        None => flags.empty_set(),
                    };
                    let rule = Rule {
                        id: 0,
                        kind,
                        flag: flag_id,
                        cross_product: *cross_product.get(flag).unwrap_or(&false),
                        strip: strip_lit,
                        append: append_lit,
                        condition: AffixCondition::new(&condition_text),
                        condition_text,
                        continuation,
                    };
                    if let Err(e) = rules.push(rule, &alphabet) {
                        diagnostics.warn_at(*lineno, e.to_string());
                    }
                }
                _ => {}
            }
        }

        Ok(AffixFile {
            alphabet,
            flags,
            rules,
            need_affix,
            fullstrip,
            try_string,
            word_chars,
            break_chars,
        })
    }
}
