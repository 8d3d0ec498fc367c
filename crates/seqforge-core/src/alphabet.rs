//! # Nucleotide Alphabet
//!
//! The 4-symbol DNA alphabet and the small helpers every other module shares:
//! parsing caller input, composition counts, and analysis-window derivation.

use crate::SeqforgeError;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// BASE
// =============================================================================

/// One nucleotide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Base {
    A,
    T,
    G,
    C,
}

/// The alphabet in search order.
///
/// Candidate sets iterate in this order, so it fixes the tie order of
/// equally-scored candidates before the random tie break.
pub const ALPHABET: [Base; 4] = [Base::A, Base::T, Base::G, Base::C];

impl Base {
    /// Parse an upper-case nucleotide letter.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Self::A),
            'T' => Some(Self::T),
            'G' => Some(Self::G),
            'C' => Some(Self::C),
            _ => None,
        }
    }

    /// The upper-case letter for this base.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::A => 'A',
            Self::T => 'T',
            Self::G => 'G',
            Self::C => 'C',
        }
    }

    /// Watson-Crick complement.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::A => Self::T,
            Self::T => Self::A,
            Self::G => Self::C,
            Self::C => Self::G,
        }
    }

    /// True for G and C.
    #[must_use]
    pub const fn is_gc(self) -> bool {
        matches!(self, Self::G | Self::C)
    }

    /// True when `self` and `other` form a Watson-Crick pair.
    #[must_use]
    pub const fn pairs_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::A, Self::T) | (Self::T, Self::A) | (Self::G, Self::C) | (Self::C, Self::G)
        )
    }

    /// Position of this base in [`ALPHABET`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::T => 1,
            Self::G => 2,
            Self::C => 3,
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// =============================================================================
// SEQUENCE HELPERS
// =============================================================================

/// Normalize and parse caller input.
///
/// Whitespace is dropped and letters are upper-cased before parsing. Any other
/// symbol is rejected with its position in the normalized text.
pub fn parse_sequence(input: &str) -> Result<Vec<Base>, SeqforgeError> {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .enumerate()
        .map(|(position, symbol)| {
            Base::from_char(symbol).ok_or(SeqforgeError::InvalidNucleotide { symbol, position })
        })
        .collect()
}

/// Render bases as a string.
#[must_use]
pub fn to_string(bases: &[Base]) -> String {
    bases.iter().map(|b| b.as_char()).collect()
}

/// The trailing `window_size` symbols, or the whole slice if shorter.
#[must_use]
pub fn analysis_window(sequence: &[Base], window_size: usize) -> &[Base] {
    let start = sequence.len().saturating_sub(window_size);
    &sequence[start..]
}

/// Number of G/C symbols.
#[must_use]
pub fn gc_count(bases: &[Base]) -> usize {
    bases.iter().filter(|b| b.is_gc()).count()
}

/// Fraction of G/C symbols, 0.0 for an empty slice.
#[must_use]
pub fn gc_fraction(bases: &[Base]) -> f64 {
    if bases.is_empty() {
        return 0.0;
    }
    gc_count(bases) as f64 / bases.len() as f64
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let bases = parse_sequence(" at\ngc ").expect("parse");
        assert_eq!(bases, vec![Base::A, Base::T, Base::G, Base::C]);
    }

    #[test]
    fn parse_rejects_unknown_symbol_with_position() {
        let err = parse_sequence("ATNG").expect_err("N is not in the alphabet");
        assert_eq!(
            err,
            SeqforgeError::InvalidNucleotide {
                symbol: 'N',
                position: 2
            }
        );
    }

    #[test]
    fn parse_accepts_empty_input() {
        assert!(parse_sequence("").expect("parse").is_empty());
    }

    #[test]
    fn window_is_trailing_slice() {
        let bases = parse_sequence("AATTGGCC").expect("parse");
        assert_eq!(to_string(analysis_window(&bases, 3)), "GCC");
        assert_eq!(to_string(analysis_window(&bases, 20)), "AATTGGCC");
    }

    #[test]
    fn gc_fraction_handles_empty() {
        assert_eq!(gc_fraction(&[]), 0.0);
        let bases = parse_sequence("ATGC").expect("parse");
        assert!((gc_fraction(&bases) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn complement_pairs() {
        for base in ALPHABET {
            assert!(base.pairs_with(base.complement()));
            assert_eq!(base.complement().complement(), base);
            assert_eq!(ALPHABET[base.index()], base);
        }
    }
}
