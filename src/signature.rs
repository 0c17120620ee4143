//! MinHash signatures.
//!
//! A [`MinHasher`] owns one [`HashFamily`] and maps any [`Tokenize`] input to
//! a [`Signature`] with one slot per hash function. Slot `i` holds
//! `min(h_i(t))` over the unique tokens `t` of the input.
//!
//! Invariant: for the same family and the same unique token set, the
//! signature is bit identical, whatever the input order or repetition.
//!
//! ## Empty inputs
//!
//! An input with no tokens has no minimum. Every slot is then set to
//! [`EMPTY_SLOT`] (`u64::MAX`), which lies outside `[0, NEXT_PRIME)` and so
//! can never be produced by a real hash. Two empty-input signatures are equal
//! to each other and differ from every non-empty signature in every slot.

use serde::{Deserialize, Serialize};

use crate::config::{MinHashConfig, MinHashError};
use crate::family::{universal_hash, HashFamily};
use crate::random::{RandomSource, SeededSource};
use crate::tokens::{TokenSet, Tokenize};

/// Slot value for inputs without tokens.
pub const EMPTY_SLOT: u64 = u64::MAX;

/// Fixed-length MinHash signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    slots: Vec<u64>,
}

impl Signature {
    /// Wrap raw slot values.
    pub fn from_slots(slots: Vec<u64>) -> Self {
        Self { slots }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<u64> {
        self.slots
    }

    /// `true` when the signature was computed from an input without tokens.
    pub fn is_empty_input(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|&v| v == EMPTY_SLOT)
    }

    /// Slots `[band * rows, (band + 1) * rows)`, if in range.
    pub fn band(&self, band: usize, rows: usize) -> Option<&[u64]> {
        let start = band.checked_mul(rows)?;
        let end = start.checked_add(rows)?;
        self.slots.get(start..end)
    }

    /// Estimated Jaccard similarity: the fraction of equal slots.
    pub fn similarity(&self, other: &Signature) -> Result<f64, MinHashError> {
        if self.len() != other.len() {
            return Err(MinHashError::SignatureLengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        if self.is_empty() {
            return Ok(0.0);
        }
        let matches = self
            .slots
            .iter()
            .zip(&other.slots)
            .filter(|(a, b)| a == b)
            .count();
        Ok(matches as f64 / self.len() as f64)
    }
}

impl AsRef<[u64]> for Signature {
    fn as_ref(&self) -> &[u64] {
        &self.slots
    }
}

impl From<Vec<u64>> for Signature {
    fn from(slots: Vec<u64>) -> Self {
        Self::from_slots(slots)
    }
}

/// Signature builder bound to one hash family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinHasher {
    family: HashFamily,
}

impl MinHasher {
    /// Build a hasher, drawing coefficients from the source selected by
    /// `config.seed`.
    pub fn new(config: &MinHashConfig) -> Result<Self, MinHashError> {
        let mut source = SeededSource::from_seed(config.seed);
        Self::with_source(config, &mut source)
    }

    /// Build a hasher, drawing coefficients from `source`.
    pub fn with_source<R>(config: &MinHashConfig, source: &mut R) -> Result<Self, MinHashError>
    where
        R: RandomSource + ?Sized,
    {
        let family = HashFamily::generate(config, source)?;
        Ok(Self { family })
    }

    /// Reuse an existing family.
    pub fn from_family(family: HashFamily) -> Self {
        Self { family }
    }

    pub fn family(&self) -> &HashFamily {
        &self.family
    }

    /// Signature length.
    pub fn hash_count(&self) -> usize {
        self.family.len()
    }

    /// Signature of a tokenizable input.
    pub fn signature<S>(&self, input: &S) -> Signature
    where
        S: Tokenize + ?Sized,
    {
        self.signature_of_set(&input.token_set())
    }

    /// Signature of raw 32-bit tokens.
    pub fn signature_tokens<I>(&self, tokens: I) -> Signature
    where
        I: IntoIterator<Item = u32>,
    {
        self.signature_of_set(&TokenSet::from_tokens(tokens))
    }

    /// Signature of an already deduplicated token set.
    pub fn signature_of_set(&self, tokens: &TokenSet) -> Signature {
        let tokens = tokens.as_slice();
        let slots = self
            .family
            .pairs()
            .map(|(a, b)| min_slot(a, b, tokens))
            .collect();
        Signature { slots }
    }
}

#[inline]
fn min_slot(a: u32, b: u32, tokens: &[u32]) -> u64 {
    tokens
        .iter()
        .map(|&t| universal_hash(a, b, t))
        .min()
        .unwrap_or(EMPTY_SLOT)
}

/// Build a hasher and return it as a plain signature function.
///
/// The returned closure owns the hash family and can be handed to
/// [`crate::Binner::with_signature_fn`].
pub fn create_signature_function<S, R>(
    config: &MinHashConfig,
    source: &mut R,
) -> Result<impl Fn(&S) -> Signature, MinHashError>
where
    S: Tokenize + ?Sized,
    R: RandomSource + ?Sized,
{
    let hasher = MinHasher::with_source(config, source)?;
    Ok(move |input: &S| hasher.signature(input))
}
