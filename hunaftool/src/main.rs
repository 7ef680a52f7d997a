use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;

use affixcore::diagnostics::Diagnostics;
use affixcore::error::AffixError;
use affixcore::{compress, expand, format, AffixFile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Dic,
    Txt,
    Csv,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dic" => Ok(Format::Dic),
            "txt" => Ok(Format::Txt),
            "csv" => Ok(Format::Csv),
            other => Err(format!("unknown format {:?} (expected dic, txt or csv)", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Dic => "dic",
            Format::Txt => "txt",
            Format::Csv => "csv",
        })
    }
}

fn format_from_extension(path: &Path) -> Option<Format> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|e| Format::from_str(e).ok())
}

/// Convert between a Hunspell affix+dictionary file pair and plain word lists.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Echo loader and conversion diagnostics instead of just counting them.
    #[clap(short, long)]
    verbose: bool,

    /// Input format, inferred from `input`'s extension when omitted.
    #[clap(short = 'i', long = "input-format")]
    input_format: Option<Format>,

    /// Output format, inferred from `output`'s extension, or from
    /// `input_format` when neither is given.
    #[clap(short = 'o', long = "output-format")]
    output_format: Option<Format>,

    /// The Hunspell `.aff` file to load.
    aff: PathBuf,

    /// The word list or dictionary to convert. Defaults to standard input.
    input: Option<PathBuf>,

    /// Where to write the result. Defaults to standard output.
    output: Option<PathBuf>,
}

fn read_input(path: &Option<PathBuf>) -> Result<String> {
    match path {
        Some(p) => fs::read_to_string(p).with_context(|| format!("could not read {}", p.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("could not read standard input")?;
            Ok(buf)
        }
    }
}

fn write_output(path: &Option<PathBuf>, text: &str) -> Result<()> {
    match path {
        Some(p) => fs::write(p, text).with_context(|| format!("could not write {}", p.display())),
        None => io::stdout()
            .write_all(text.as_bytes())
            .context("could not write standard output"),
    }
}

fn drain_diagnostics(diagnostics: &mut Diagnostics, verbose: bool) {
    if verbose {
        diagnostics.drain_to(|d| eprintln!("{}", d));
    } else {
        let count = diagnostics.len();
        diagnostics.drain_to(|_| {});
        if count > 0 {
            eprintln!("{} diagnostic(s); rerun with -v to see them", count);
        }
    }
}

/// Loads the affix file. Only an unsupported character-set declaration
/// or an alphabet overflow can fail this outright; everything else is
/// advisory and lands in `diagnostics`.
fn load_aff(aff_text: &str, diagnostics: &mut Diagnostics) -> Result<AffixFile> {
    Ok(AffixFile::parse(aff_text, diagnostics)?)
}

fn expand_dic(
    aff: &AffixFile,
    dic_text: &str,
    diagnostics: &mut Diagnostics,
) -> std::result::Result<std::collections::BTreeSet<String>, AffixError> {
    let entries = format::read_dic(dic_text, &aff.flags, diagnostics);
    let mut words = std::collections::BTreeSet::new();
    for entry in entries {
        expand::expand_stem_into(
            &entry.stem,
            &entry.flags,
            &aff.alphabet,
            &aff.rules,
            aff.need_affix,
            aff.fullstrip,
            &mut words,
        )?;
    }
    Ok(words)
}

/// Runs `attempt` once; if it fails with an unknown alphabet character,
/// seeds a fresh copy of `aff`'s alphabet from both input files (the
/// affix file's own text and the word list/dictionary being converted)
/// and retries exactly once, per the external interface's single-retry
/// promise. Any other failure, or a second `UnknownAlphabetCharacter`,
/// propagates. Diagnostics from a failed first attempt are discarded so
/// they aren't duplicated alongside the retry's.
fn with_alphabet_retry<T>(
    aff: &AffixFile,
    aff_text: &str,
    other_text: &str,
    diagnostics: &mut Diagnostics,
    mut attempt: impl FnMut(&AffixFile, &mut Diagnostics) -> std::result::Result<T, AffixError>,
) -> Result<T> {
    let mut first_diagnostics = Diagnostics::new();
    match attempt(aff, &mut first_diagnostics) {
        Ok(v) => {
            *diagnostics = first_diagnostics;
            Ok(v)
        }
        Err(AffixError::UnknownAlphabetCharacter(_)) => {
            let mut retried = aff.clone();
            for c in aff_text.chars().chain(other_text.chars()) {
                retried.alphabet.observe(c)?;
            }
            let mut retry_diagnostics = Diagnostics::new();
            let v = attempt(&retried, &mut retry_diagnostics)?;
            *diagnostics = retry_diagnostics;
            Ok(v)
        }
        Err(e) => Err(e.into()),
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let aff_text = fs::read_to_string(&cli.aff)
        .with_context(|| format!("could not read {}", cli.aff.display()))?;
    let input_text = read_input(&cli.input)?;

    let input_format = cli
        .input_format
        .or_else(|| cli.input.as_deref().and_then(format_from_extension))
        .context("cannot infer input format; pass -i explicitly")?;

    let output_format = cli.output_format.or_else(|| {
        cli.output
            .as_deref()
            .and_then(format_from_extension)
            .or(match input_format {
                Format::Dic => Some(Format::Csv),
                Format::Txt | Format::Csv => Some(Format::Dic),
            })
    });
    let output_format = output_format.context("cannot infer output format; pass -o explicitly")?;

    let mut diagnostics = Diagnostics::new();
    let aff = load_aff(&aff_text, &mut diagnostics)?;

    let output_text = match (input_format, output_format) {
        (Format::Dic, Format::Dic) => {
            return Err(AffixError::UnsupportedConversion {
                from: "dic",
                to: "dic",
            }
            .into());
        }
        (Format::Dic, _) => {
            let words = with_alphabet_retry(
                &aff,
                &aff_text,
                &input_text,
                &mut diagnostics,
                |aff, diag| expand_dic(aff, &input_text, diag),
            )?;
            match output_format {
                Format::Txt => format::write_txt(&words),
                Format::Csv => format::write_csv(&words),
                Format::Dic => unreachable!(),
            }
        }
        (Format::Txt, Format::Dic) | (Format::Csv, Format::Dic) => {
            let words = match input_format {
                Format::Txt => format::read_txt(&input_text),
                Format::Csv => format::read_csv(&input_text),
                Format::Dic => unreachable!(),
            };
            let report = with_alphabet_retry(
                &aff,
                &aff_text,
                &input_text,
                &mut diagnostics,
                |aff, _diag| compress::compress(&words, aff),
            )?;
            if !report.remainder.is_empty() {
                diagnostics.warn(format!(
                    "{} word(s) could not be derived from any other entry and were kept as-is",
                    report.remainder.len()
                ));
            }
            format::write_dic(&report.entries, &aff.flags)
        }
        (Format::Txt, Format::Txt) | (Format::Csv, Format::Csv) => {
            let words = match input_format {
                Format::Txt => format::read_txt(&input_text),
                _ => format::read_csv(&input_text),
            };
            format::write_txt(&words)
        }
        (Format::Txt, Format::Csv) | (Format::Csv, Format::Txt) => {
            let words = match input_format {
                Format::Txt => format::read_txt(&input_text),
                _ => format::read_csv(&input_text),
            };
            match output_format {
                Format::Csv => format::write_csv(&words),
                Format::Txt => format::write_txt(&words),
                Format::Dic => unreachable!(),
            }
        }
    };

    write_output(&cli.output, &output_text)?;
    drain_diagnostics(&mut diagnostics, cli.verbose);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
