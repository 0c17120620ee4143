//! Token extraction for MinHash inputs.
//!
//! Strings contribute one token per character (its Unicode scalar value).
//! Slices and vectors of arbitrary elements contribute one token per element,
//! the low 32 bits of an xxh3 hash of the element. Either way the tokens are
//! collapsed into a [`TokenSet`], so order and repetition never matter.

use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::Xxh3;

/// Sorted set of unique 32-bit tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TokenSet {
    tokens: Vec<u32>,
}

impl TokenSet {
    /// Collect tokens, dropping duplicates.
    pub fn from_tokens<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut tokens: Vec<u32> = tokens.into_iter().collect();
        tokens.sort_unstable();
        tokens.dedup();
        Self { tokens }
    }

    /// Number of unique tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in ascending order.
    pub fn as_slice(&self) -> &[u32] {
        &self.tokens
    }

    pub fn contains(&self, token: u32) -> bool {
        self.tokens.binary_search(&token).is_ok()
    }

    /// Exact Jaccard similarity with another set.
    ///
    /// Two empty sets are treated as identical (1.0).
    pub fn jaccard(&self, other: &TokenSet) -> f64 {
        if self.is_empty() && other.is_empty() {
            return 1.0;
        }
        let shared = self.tokens.iter().filter(|&&t| other.contains(t)).count();
        let union = self.len() + other.len() - shared;
        shared as f64 / union as f64
    }
}

impl FromIterator<u32> for TokenSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::from_tokens(iter)
    }
}

/// 32-bit content hash of an arbitrary element.
pub fn content_hash<T>(value: &T) -> u32
where
    T: Hash + ?Sized,
{
    let mut hasher = Xxh3::new();
    value.hash(&mut hasher);
    hasher.finish() as u32
}

/// Inputs that can be reduced to a [`TokenSet`].
pub trait Tokenize {
    fn token_set(&self) -> TokenSet;
}

impl Tokenize for str {
    fn token_set(&self) -> TokenSet {
        self.chars().map(u32::from).collect()
    }
}

impl Tokenize for String {
    fn token_set(&self) -> TokenSet {
        self.as_str().token_set()
    }
}

impl<T: Hash> Tokenize for [T] {
    fn token_set(&self) -> TokenSet {
        self.iter().map(content_hash).collect()
    }
}

impl<T: Hash> Tokenize for Vec<T> {
    fn token_set(&self) -> TokenSet {
        self.as_slice().token_set()
    }
}

impl<T: Hash, const N: usize> Tokenize for [T; N] {
    fn token_set(&self) -> TokenSet {
        self.as_slice().token_set()
    }
}

impl Tokenize for TokenSet {
    fn token_set(&self) -> TokenSet {
        self.clone()
    }
}

impl<S: Tokenize + ?Sized> Tokenize for &S {
    fn token_set(&self) -> TokenSet {
        (**self).token_set()
    }
}
