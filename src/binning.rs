//! LSH band binning.
//!
//! Each signature is cut into `bands = len / rows` contiguous slices. Every
//! distinct `(band, slice)` pair seen during one binning call gets the next
//! integer id, starting at 0, in the order items and bands are visited. Two
//! items whose slices for band `j` are identical therefore share the id for
//! band `j`, and items sharing any id are candidate near-duplicates.
//!
//! Ids are clustering labels for one call only: they depend on traversal
//! order and change when items are reordered.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::signature::Signature;

/// Errors returned by band binning.
///
/// All variants describe caller configuration problems and are raised before
/// the offending item contributes any bucket.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BinningError {
    #[error("invalid binning config: no signature function was provided")]
    MissingSignatureFn,

    #[error("invalid binning config: rows must be >= 1 (got {rows})")]
    InvalidRows { rows: usize },

    #[error("invalid binning config: signature length {len} is not divisible by rows={rows}")]
    RowsDoNotDivide { len: usize, rows: usize },

    #[error("item {item}: signature length {found} differs from reference length {expected}")]
    SignatureLengthMismatch {
        item: usize,
        expected: usize,
        found: usize,
    },

    #[error("malformed bins: {reason}")]
    MalformedBins { reason: String },
}

/// Band/row layout of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandingScheme {
    bands: usize,
    rows: usize,
}

impl BandingScheme {
    /// Layout for signatures of `signature_len` slots split into bands of
    /// `rows` slots.
    pub fn new(signature_len: usize, rows: usize) -> Result<Self, BinningError> {
        if rows == 0 {
            return Err(BinningError::InvalidRows { rows });
        }
        if signature_len % rows != 0 {
            return Err(BinningError::RowsDoNotDivide {
                len: signature_len,
                rows,
            });
        }
        Ok(Self {
            bands: signature_len / rows,
            rows,
        })
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn signature_len(&self) -> usize {
        self.bands * self.rows
    }

    /// Probability that two items with Jaccard similarity `s` share at least
    /// one bucket: `1 - (1 - s^r)^b`.
    pub fn candidate_probability(&self, s: f64) -> f64 {
        let r = self.rows as f64;
        let b = self.bands as f64;
        1.0 - (1.0 - s.powf(r)).powf(b)
    }

    /// Similarity at which the candidate probability curve is steepest,
    /// approximately `(1 / b)^(1 / r)`.
    pub fn threshold(&self) -> f64 {
        if self.bands == 0 {
            return 1.0;
        }
        (1.0 / self.bands as f64).powf(1.0 / self.rows as f64)
    }
}

/// Bucket ids per item, one per band, in item input order.
///
/// Deserialized bins are checked against the layout a binning call
/// produces: `bands` ids per item, ids unique to one band, and ids first
/// seen in increasing order up to `bucket_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBins")]
pub struct Bins {
    bins: Vec<Vec<usize>>,
    bands: usize,
    bucket_count: usize,
}

#[derive(Deserialize)]
struct RawBins {
    bins: Vec<Vec<usize>>,
    bands: usize,
    bucket_count: usize,
}

impl TryFrom<RawBins> for Bins {
    type Error = BinningError;

    fn try_from(raw: RawBins) -> Result<Self, Self::Error> {
        let malformed = |reason: String| BinningError::MalformedBins { reason };

        if raw.bins.is_empty() && (raw.bands != 0 || raw.bucket_count != 0) {
            return Err(malformed(format!(
                "no items but bands={} bucket_count={}",
                raw.bands, raw.bucket_count
            )));
        }

        // Band that owns each id, indexed by id.
        let mut owner: Vec<usize> = Vec::new();
        for (item, ids) in raw.bins.iter().enumerate() {
            if ids.len() != raw.bands {
                return Err(malformed(format!(
                    "item {item} has {} ids, expected {}",
                    ids.len(),
                    raw.bands
                )));
            }
            for (band, &id) in ids.iter().enumerate() {
                match owner.get(id) {
                    Some(&seen) if seen == band => {}
                    Some(&seen) => {
                        return Err(malformed(format!(
                            "id {id} used in band {band} and band {seen}"
                        )))
                    }
                    None if id == owner.len() => owner.push(band),
                    None => {
                        return Err(malformed(format!(
                            "item {item} band {band}: id {id} skips unassigned id {}",
                            owner.len()
                        )))
                    }
                }
            }
        }

        if owner.len() != raw.bucket_count {
            return Err(malformed(format!(
                "bucket_count is {} but {} ids are assigned",
                raw.bucket_count,
                owner.len()
            )));
        }

        Ok(Self {
            bins: raw.bins,
            bands: raw.bands,
            bucket_count: raw.bucket_count,
        })
    }
}

impl Bins {
    /// Number of binned items.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bands per item (0 when nothing was binned).
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Number of distinct buckets across all bands.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    /// Bucket ids of item `item`, in band order.
    pub fn get(&self, item: usize) -> Option<&[usize]> {
        self.bins.get(item).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.bins.iter().map(Vec::as_slice)
    }

    pub fn into_inner(self) -> Vec<Vec<usize>> {
        self.bins
    }

    /// Members of every bucket, keyed by bucket id. Members are item
    /// indices in ascending order.
    pub fn buckets(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (item, ids) in self.bins.iter().enumerate() {
            for &id in ids {
                buckets.entry(id).or_default().push(item);
            }
        }
        buckets
    }

    /// Item pairs `(i, j)` with `i < j` that share at least one bucket.
    pub fn candidate_pairs(&self) -> BTreeSet<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for members in self.buckets().values() {
            for (k, &i) in members.iter().enumerate() {
                for &j in &members[k + 1..] {
                    pairs.insert((i, j));
                }
            }
        }
        pairs
    }
}

impl std::ops::Index<usize> for Bins {
    type Output = [usize];

    fn index(&self, item: usize) -> &[usize] {
        &self.bins[item]
    }
}

/// Signature function accepted by [`Binner`].
pub type SignatureFn<'a, T> = Box<dyn Fn(&T) -> Signature + 'a>;

/// Band binner over items of type `T`.
///
/// ```
/// use minhash::{Binner, MinHashConfig, MinHasher};
///
/// let hasher = MinHasher::new(&MinHashConfig::new().with_hash_count(8).with_seed(1)).unwrap();
/// let binner = Binner::new(2).with_signature_fn(|s: &&str| hasher.signature(*s));
///
/// let bins = binner.bin(&["abc", "cab", "xyz"]).unwrap();
/// assert_eq!(bins.bands(), 4);
/// assert_eq!(bins[0], bins[1]);
/// ```
pub struct Binner<'a, T> {
    rows: usize,
    signature_fn: Option<SignatureFn<'a, T>>,
}

impl<'a, T> Binner<'a, T> {
    /// Binner with `rows` slots per band and no signature function yet.
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            signature_fn: None,
        }
    }

    /// Set the function computing each item's signature.
    pub fn with_signature_fn<F>(mut self, signature_fn: F) -> Self
    where
        F: Fn(&T) -> Signature + 'a,
    {
        self.signature_fn = Some(Box::new(signature_fn));
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Bin `items`, computing one signature per item.
    ///
    /// The first item's signature fixes the signature length and the band
    /// layout. Configuration errors are reported before any bucket is
    /// assigned.
    pub fn bin(&self, items: &[T]) -> Result<Bins, BinningError> {
        let signature_fn = self.checked_signature_fn()?;
        let Some((first, rest)) = items.split_first() else {
            return Ok(Bins::default());
        };

        let reference = signature_fn(first);
        let scheme = BandingScheme::new(reference.len(), self.rows)?;
        assign_in_order(scheme, reference, rest.iter().map(|item| signature_fn(item)))
    }

    /// Bin precomputed signatures. No signature function is needed.
    pub fn bin_signatures<S>(&self, signatures: &[S]) -> Result<Bins, BinningError>
    where
        S: AsRef<[u64]>,
    {
        if self.rows == 0 {
            return Err(BinningError::InvalidRows { rows: self.rows });
        }
        let Some(first) = signatures.first() else {
            return Ok(Bins::default());
        };

        let mut assigner =
            BucketAssigner::new(BandingScheme::new(first.as_ref().len(), self.rows)?);
        for (i, signature) in signatures.iter().enumerate() {
            assigner.push(i, signature.as_ref())?;
        }
        Ok(assigner.finish())
    }

    fn checked_signature_fn(&self) -> Result<&SignatureFn<'a, T>, BinningError> {
        let signature_fn = self
            .signature_fn
            .as_ref()
            .ok_or(BinningError::MissingSignatureFn)?;
        if self.rows == 0 {
            return Err(BinningError::InvalidRows { rows: self.rows });
        }
        Ok(signature_fn)
    }
}

impl<T> fmt::Debug for Binner<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binner")
            .field("rows", &self.rows)
            .field("has_signature_fn", &self.signature_fn.is_some())
            .finish()
    }
}

/// Bin `items` with `signature_fn`, `rows` slots per band.
pub fn binning<T, F>(signature_fn: F, rows: usize, items: &[T]) -> Result<Bins, BinningError>
where
    F: Fn(&T) -> Signature,
{
    Binner::new(rows).with_signature_fn(signature_fn).bin(items)
}

/// Like [`binning`], but computes the signatures on the rayon pool.
///
/// Ids are assigned afterwards in one sequential pass in item order, so the
/// result is identical to [`binning`].
#[cfg(feature = "parallel")]
pub fn par_binning<T, F>(signature_fn: F, rows: usize, items: &[T]) -> Result<Bins, BinningError>
where
    T: Sync,
    F: Fn(&T) -> Signature + Sync,
{
    use rayon::prelude::*;

    if rows == 0 {
        return Err(BinningError::InvalidRows { rows });
    }
    let Some((first, rest)) = items.split_first() else {
        return Ok(Bins::default());
    };

    let reference = signature_fn(first);
    let scheme = BandingScheme::new(reference.len(), rows)?;
    let signatures: Vec<Signature> = rest.par_iter().map(|item| signature_fn(item)).collect();
    assign_in_order(scheme, reference, signatures)
}

/// Assign ids for `reference` (item 0) followed by `rest`, in order.
fn assign_in_order<I>(
    scheme: BandingScheme,
    reference: Signature,
    rest: I,
) -> Result<Bins, BinningError>
where
    I: IntoIterator<Item = Signature>,
{
    let mut assigner = BucketAssigner::new(scheme);
    assigner.push(0, reference.as_slice())?;
    for (i, signature) in rest.into_iter().enumerate() {
        assigner.push(i + 1, signature.as_slice())?;
    }
    Ok(assigner.finish())
}

/// Sequential first-seen id assignment for one binning call.
struct BucketAssigner {
    scheme: BandingScheme,
    // One map per band; the band index is the position.
    bands: Vec<HashMap<Vec<u64>, usize>>,
    next_id: usize,
    bins: Vec<Vec<usize>>,
}

impl BucketAssigner {
    fn new(scheme: BandingScheme) -> Self {
        Self {
            scheme,
            bands: vec![HashMap::new(); scheme.bands()],
            next_id: 0,
            bins: Vec::new(),
        }
    }

    fn push(&mut self, item: usize, signature: &[u64]) -> Result<(), BinningError> {
        let expected = self.scheme.signature_len();
        if signature.len() != expected {
            return Err(BinningError::SignatureLengthMismatch {
                item,
                expected,
                found: signature.len(),
            });
        }

        let mut ids = Vec::with_capacity(self.scheme.bands());
        for (band, slice) in signature.chunks_exact(self.scheme.rows()).enumerate() {
            ids.push(self.id_for(band, slice));
        }
        self.bins.push(ids);
        Ok(())
    }

    fn id_for(&mut self, band: usize, slice: &[u64]) -> usize {
        let map = &mut self.bands[band];
        if let Some(&id) = map.get(slice) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        map.insert(slice.to_vec(), id);
        id
    }

    fn finish(self) -> Bins {
        debug!(
            items = self.bins.len(),
            bands = self.scheme.bands(),
            rows = self.scheme.rows(),
            buckets = self.next_id,
            "binning_complete"
        );
        Bins {
            bins: self.bins,
            bands: self.scheme.bands(),
            bucket_count: self.next_id,
        }
    }
}
