//! # MinHash signatures and LSH band binning
//!
//! This crate estimates Jaccard similarity between token sets with MinHash
//! signatures, and groups similar items with locality-sensitive hashing
//! (LSH) without comparing every pair.
//!
//! ## Contract
//!
//! - The API is a pure function of `(hash family, input)` with no I/O and no
//!   global state. The only randomness is drawing the hash family, which is
//!   reproducible when [`MinHashConfig::seed`] is set.
//! - Signatures are probabilistic: equal signatures do not prove equal sets,
//!   and the fraction of equal slots only estimates the Jaccard similarity.
//!
//! Invariant: for the same [`HashFamily`] and the same set of unique tokens,
//! the signature is bit identical.
//!
//! ## Pipeline
//!
//! 1.  **Hash family**: `hash_count` coefficient pairs `(a_i, b_i)` are drawn
//!     once, with values distinct within each set. The number of draws is
//!     bounded; a degenerate random source fails with
//!     [`MinHashError::CoefficientsExhausted`] instead of spinning forever.
//!
//! 2.  **Signature**: the input is reduced to its unique 32-bit tokens
//!     (character codes for strings, content hashes for element sequences).
//!     Slot `i` holds the minimum of `(a_i * t + b_i) mod 4294967311` over
//!     all tokens `t`, computed in 64-bit arithmetic.
//!
//! 3.  **Binning**: each signature is cut into bands of `rows` slots. Items
//!     with an identical slice in a band share that band's bucket id.
//!
//! ## Example Usage
//!
//! ```
//! use minhash::{binning, MinHashConfig, MinHasher};
//!
//! let config = MinHashConfig::new().with_hash_count(64).with_seed(7);
//! let hasher = MinHasher::new(&config).unwrap();
//!
//! let a = hasher.signature("the quick brown fox");
//! let b = hasher.signature("the quick brown fox!");
//! assert!(a.similarity(&b).unwrap() > 0.5);
//!
//! let docs = ["listen", "silent", "banana"];
//! let bins = binning(|d: &&str| hasher.signature(*d), 4, &docs).unwrap();
//! assert_eq!(bins.bands(), 16);
//! assert_eq!(bins[0], bins[1]);
//! ```
//!
//! ## Parallelism
//!
//! [`MinHasher`] is immutable and `Send + Sync`; callers may compute
//! signatures for many items concurrently. Bucket ids are always assigned in
//! a single sequential pass. With the `parallel` feature, `par_binning`
//! computes the signatures on the rayon pool before that pass; it needs a
//! `Sync` signature function, while [`binning`] and [`Binner`] accept any
//! callable.
pub mod binning;
pub mod config;
pub mod family;
pub mod random;
pub mod signature;
pub mod tokens;

pub use crate::binning::{binning, BandingScheme, Binner, BinningError, Bins, SignatureFn};
#[cfg(feature = "parallel")]
pub use crate::binning::par_binning;
pub use crate::config::{CoefficientSet, MinHashConfig, MinHashError};
pub use crate::family::{universal_hash, HashFamily, NEXT_PRIME};
pub use crate::random::{RandomSource, SeededSource};
pub use crate::signature::{create_signature_function, MinHasher, Signature, EMPTY_SLOT};
pub use crate::tokens::{content_hash, TokenSet, Tokenize};

