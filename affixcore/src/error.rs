use thiserror::Error;

/// Typed failures from the affix engine.
///
/// Everything else (malformed DIC lines, unknown flag references, a
/// condition field that needed heuristic repair) is advisory and goes
/// through [`crate::diagnostics::Diagnostics`] instead of here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AffixError {
    #[error("character {0:?} is not in the affix file's alphabet")]
    UnknownAlphabetCharacter(char),

    #[error("alphabet cannot hold more than 256 distinct characters")]
    AlphabetOverflow,

    #[error("malformed affix file at line {line}: {message}")]
    MalformedAff { line: usize, message: String },

    #[error("no conversion from {from} to {to}")]
    UnsupportedConversion {
        from: &'static str,
        to: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, AffixError>;
