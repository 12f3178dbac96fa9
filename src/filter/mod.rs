// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod bit_array;

use crate::record::{Id, ID_LEN};
use bit_array::BitArray;
use byteorder::{LittleEndian, ReadBytesExt};

/// Target false positive rate of emitted filters.
pub const FALSE_POSITIVE_RATE: f64 = 0.1;

/// Starting offset of the hash walk over the doubled identifier.
const FILTER_OFFSET: usize = 0;

/// Stride of the hash walk over the doubled identifier.
const FILTER_RANGE: usize = 9;

/// A per-node Bloom filter over piece identifiers.
///
/// The bitmap layout reproduces the filter format consumed downstream, so
/// construction is bit-exact rather than merely probabilistically
/// equivalent: each of the `k` probes reads a little-endian u64 from a
/// sliding window over the identifier's bytes, picks the target byte as
/// that value modulo the bitmap length, and picks the bit inside the byte
/// from the byte that follows the window. Doubling the identifier lets the
/// window wrap past its end without a bounds split.
///
/// The bitmap is sized from the number of piece records it will absorb,
/// derived from the 10% false positive target.
#[derive(Debug, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct BloomFilter {
    /// Raw bytes exposed as bit array
    inner: BitArray,

    /// Number of hash functions
    k: usize,
}

#[allow(clippy::len_without_is_empty)]
impl BloomFilter {
    /// Bits per element for the target false positive rate.
    #[must_use]
    pub fn bits_per_element() -> f64 {
        -1.44 * FALSE_POSITIVE_RATE.log2()
    }

    /// Number of probes per identifier.
    #[must_use]
    pub fn hash_fn_count() -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let k = (Self::bits_per_element() * std::f64::consts::LN_2).ceil() as usize;
        k.min(32)
    }

    /// Constructs a filter sized for `n` piece records.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero; an empty partition has no filter.
    #[must_use]
    pub fn with_piece_count(n: u64) -> Self {
        assert!(n > 0, "filter cannot be sized for zero pieces");

        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let bytes = ((n as f64) * Self::bits_per_element() / 8.0).ceil() as usize;

        Self {
            inner: BitArray::with_capacity(bytes),
            k: Self::hash_fn_count(),
        }
    }

    /// Restores a filter from an emitted bitmap.
    ///
    /// # Panics
    ///
    /// Panics if the bitmap is empty.
    #[must_use]
    pub fn from_bytes(bytes: Box<[u8]>) -> Self {
        assert!(!bytes.is_empty(), "filter bitmap cannot be empty");

        Self {
            inner: BitArray::from_bytes(bytes),
            k: Self::hash_fn_count(),
        }
    }

    /// Returns the size of the bitmap in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns the raw bitmap.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.inner.bytes()
    }

    /// Records the piece in the filter.
    pub fn set(&mut self, piece_id: &Id) {
        for (bucket, bit) in HashWalk::new(piece_id, self.inner.len(), self.k) {
            self.inner.enable(bucket, bit);
        }
    }

    /// Returns `true` if the piece may have been recorded.
    ///
    /// Will never have a false negative.
    #[must_use]
    pub fn contains(&self, piece_id: &Id) -> bool {
        HashWalk::new(piece_id, self.inner.len(), self.k).all(|(bucket, bit)| self.inner.get(bucket, bit))
    }
}

/// The probe sequence of one identifier: `k` pairs of bitmap byte index
/// and bit byte.
struct HashWalk {
    doubled: [u8; 2 * ID_LEN],
    m_bytes: u64,
    offset: usize,
    remaining: usize,
}

impl HashWalk {
    fn new(piece_id: &Id, m_bytes: usize, k: usize) -> Self {
        debug_assert!(m_bytes > 0, "bitmap cannot be empty");

        let mut doubled = [0; 2 * ID_LEN];
        doubled[..ID_LEN].copy_from_slice(piece_id.as_bytes());
        doubled[ID_LEN..].copy_from_slice(piece_id.as_bytes());

        Self {
            doubled,
            m_bytes: m_bytes as u64,
            offset: FILTER_OFFSET,
            remaining: k,
        }
    }
}

impl Iterator for HashWalk {
    type Item = (usize, u8);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        // The window at offset 27 reaches into the duplicated bytes, and
        // the bit byte of the last probe overlaps the next window.
        let mut window = &self.doubled[self.offset..];

        #[allow(clippy::expect_used)]
        let hash = window.read_u64::<LittleEndian>().expect("cannot fail");

        let bit = self.doubled[self.offset + 8];

        #[allow(clippy::cast_possible_truncation)]
        let bucket = (hash % self.m_bytes) as usize;

        self.offset = (self.offset + FILTER_RANGE) % ID_LEN;

        Some((bucket, bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn piece(fill: u8) -> Id {
        Id::from_bytes([fill; ID_LEN])
    }

    #[test]
    fn four_probes_at_ten_percent() {
        assert_eq!(4, BloomFilter::hash_fn_count());

        let bpe = BloomFilter::bits_per_element();
        assert!(bpe > 4.78 && bpe < 4.79);
    }

    #[test]
    fn bitmap_sizing() {
        assert_eq!(1, BloomFilter::with_piece_count(1).len());
        assert_eq!(2, BloomFilter::with_piece_count(2).len());
        assert_eq!(60, BloomFilter::with_piece_count(100).len());
        assert_eq!(598, BloomFilter::with_piece_count(1_000).len());
    }

    #[test]
    #[should_panic(expected = "filter cannot be sized for zero pieces")]
    fn zero_pieces_rejected() {
        let _ = BloomFilter::with_piece_count(0);
    }

    #[test]
    fn corner_identifiers_single_byte_bitmap() {
        // All-zero piece: every probe reads hash 0 and bit byte 0.
        let mut filter = BloomFilter::with_piece_count(1);
        filter.set(&piece(0x00));
        assert_eq!(&[0x01], filter.bytes());

        // All-ones piece: every probe reads u64::MAX and bit byte 0xff.
        let mut filter = BloomFilter::with_piece_count(1);
        filter.set(&piece(0xff));
        assert_eq!(&[0x80], filter.bytes());
    }

    #[test]
    fn probe_walk_strides_by_nine() {
        let mut bytes = [0u8; ID_LEN];
        for (idx, byte) in bytes.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *byte = idx as u8;
            }
        }

        let offsets: Vec<usize> = {
            let mut walk = HashWalk::new(&Id::from_bytes(bytes), 1, 4);
            let mut offsets = vec![walk.offset];
            for _ in 0..3 {
                let _ = walk.next();
                offsets.push(walk.offset);
            }
            offsets
        };

        assert_eq!(vec![0, 9, 18, 27], offsets);

        // The last window wraps into the duplicated half.
        let (_, bit) = HashWalk::new(&Id::from_bytes(bytes), 1, 4)
            .nth(3)
            .expect("walk has four probes");
        assert_eq!(3, bit); // doubled[35] == bytes[3]
    }

    #[test]
    fn no_false_negatives() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        let pieces: Vec<Id> = (0..10_000).map(|_| Id::from_bytes(rng.random())).collect();

        let mut filter = BloomFilter::with_piece_count(pieces.len() as u64);
        for piece_id in &pieces {
            filter.set(piece_id);
        }

        for piece_id in &pieces {
            assert!(filter.contains(piece_id));
        }
    }

    #[test]
    fn false_positive_rate_near_target() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let item_count = 50_000;

        let mut filter = BloomFilter::with_piece_count(item_count);
        for _ in 0..item_count {
            filter.set(&Id::from_bytes(rng.random()));
        }

        let mut false_positives = 0;
        for _ in 0..item_count {
            if filter.contains(&Id::from_bytes(rng.random())) {
                false_positives += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let fpr = f64::from(false_positives) / item_count as f64;
        assert!(fpr > 0.05);
        assert!(fpr < 0.15);
    }

    #[test]
    fn construction_is_deterministic() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let pieces: Vec<Id> = (0..1_000).map(|_| Id::from_bytes(rng.random())).collect();

        let mut a = BloomFilter::with_piece_count(pieces.len() as u64);
        let mut b = BloomFilter::with_piece_count(pieces.len() as u64);

        for piece_id in &pieces {
            a.set(piece_id);
        }
        for piece_id in pieces.iter().rev() {
            b.set(piece_id);
        }

        assert_eq!(a, b);
    }

    #[test]
    fn round_trips_through_raw_bytes() {
        let mut filter = BloomFilter::with_piece_count(10);
        filter.set(&piece(0xab));

        let copy = BloomFilter::from_bytes(filter.bytes().into());
        assert_eq!(filter, copy);
        assert!(copy.contains(&piece(0xab)));
        assert!(!copy.contains(&piece(0x13)));
    }
}
