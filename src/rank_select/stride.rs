use log::trace;

use crate::common::{popcount, select64};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{put_u64, take_u64, Wire};

//------------ Stride --------------------------------------------------------

/// A mutable rank/select bitvector: linear search over strides of `W` words,
/// steered by a Fenwick tree of per-stride popcounts.
///
/// The tree `T` holds one summary per `W` consecutive bitvector words (plus
/// a trailing, possibly empty stride), so `rank` pays one tree walk plus at
/// most `W` popcounts, and `select` turns into the tree's searchable
/// partial-sum query followed by a stride scan. `T` must be instantiated
/// with bound `64 * W`, the worst-case stride popcount; this is asserted at
/// construction and makes `comp_find` an exact complement, which is what
/// `select_zero` relies on.
#[derive(Clone, Debug)]
pub struct Stride<T, const W: usize> {
    tree: T,
    bitvector: DArray<u64>,
}

impl<T: FenwickTree, const W: usize> Stride<T, W> {
    /// Build from a slice of 64-bit words.
    pub fn new(bitvector: &[u64]) -> Self {
        const { assert!(W >= 1, "the stride must span at least one word") };
        assert_eq!(
            T::BOUND,
            64 * W as u64,
            "tree bound must equal the stride bit width"
        );

        let length = bitvector.len();
        let mut sequence = vec![0u64; length / W + 1];
        for (i, &word) in bitvector.iter().enumerate() {
            sequence[i / W] += popcount(word) as u64;
        }
        trace!(
            "stride bitvector: {} words, {} summaries",
            length,
            sequence.len()
        );

        let tree = T::new(&sequence);
        let mut copy = DArray::new(length);
        copy.copy_from_slice(bitvector);

        Self { tree, bitvector: copy }
    }

    /// The underlying words.
    pub fn bitvector(&self) -> &[u64] {
        &self.bitvector
    }

    /// The length of the bitvector, in words.
    pub fn size(&self) -> usize {
        self.bitvector.len()
    }

    /// The number of 1-bits among the first `pos` bits.
    ///
    /// # Panics
    ///
    /// If `pos` exceeds the bit length.
    pub fn rank(&self, pos: usize) -> u64 {
        assert!(pos <= self.bitvector.len() * 64, "position out of range");

        // Whole strides through the tree, whole words by scanning, then the
        // partial tail word.
        let idx = pos / (64 * W);
        let mut value = self.tree.prefix(idx);

        for i in idx * W..pos / 64 {
            value += popcount(self.bitvector[i]) as u64;
        }

        if pos % 64 != 0 {
            value += popcount(
                self.bitvector[pos / 64] & ((1u64 << (pos % 64)) - 1),
            ) as u64;
        }

        value
    }

    /// The number of 1-bits in the bit range `from..to`.
    pub fn rank_range(&self, from: usize, to: usize) -> u64 {
        self.rank(to) - self.rank(from)
    }

    /// The number of 0-bits among the first `pos` bits.
    pub fn rank_zero(&self, pos: usize) -> u64 {
        pos as u64 - self.rank(pos)
    }

    /// The number of 0-bits in the bit range `from..to`.
    pub fn rank_zero_range(&self, from: usize, to: usize) -> u64 {
        (to - from) as u64 - self.rank_range(from, to)
    }

    /// The position of the `rank`-th 1-bit (0-based), or `None` if fewer
    /// than `rank + 1` bits are set.
    pub fn select(&self, rank: u64) -> Option<usize> {
        let mut rank = rank;
        let idx = self.tree.find(&mut rank);

        for i in idx * W..(idx + 1) * W {
            if i >= self.bitvector.len() {
                return None;
            }

            let chunk = popcount(self.bitvector[i]) as u64;
            if rank < chunk {
                return Some(
                    i * 64 + select64(self.bitvector[i], rank) as usize,
                );
            }
            rank -= chunk;
        }

        None
    }

    /// The position of the `rank`-th 0-bit (0-based), or `None` if fewer
    /// than `rank + 1` bits are clear.
    pub fn select_zero(&self, rank: u64) -> Option<usize> {
        let mut rank = rank;
        let idx = self.tree.comp_find(&mut rank);

        for i in idx * W..(idx + 1) * W {
            if i >= self.bitvector.len() {
                return None;
            }

            let chunk = popcount(!self.bitvector[i]) as u64;
            if rank < chunk {
                return Some(
                    i * 64 + select64(!self.bitvector[i], rank) as usize,
                );
            }
            rank -= chunk;
        }

        None
    }

    /// Replace word `index`, returning the previous word. The popcount
    /// summary of the containing stride is adjusted.
    pub fn update(&mut self, index: usize, word: u64) -> u64 {
        let old = self.bitvector[index];
        self.bitvector[index] = word;
        self.tree.add(
            index / W + 1,
            popcount(word) as i64 - popcount(old) as i64,
        );

        old
    }

    /// Set bit `index`, returning its previous value.
    pub fn set(&mut self, index: usize) -> bool {
        let old = self.bitvector[index / 64];
        self.bitvector[index / 64] |= 1u64 << (index % 64);
        let changed = self.bitvector[index / 64] != old;
        self.tree.add(index / (W * 64) + 1, changed as i64);

        !changed
    }

    /// Clear bit `index`, returning its previous value.
    pub fn clear(&mut self, index: usize) -> bool {
        let old = self.bitvector[index / 64];
        self.bitvector[index / 64] &= !(1u64 << (index % 64));
        let changed = self.bitvector[index / 64] != old;
        self.tree.add(index / (W * 64) + 1, -(changed as i64));

        changed
    }

    /// Flip bit `index`, returning its previous value.
    pub fn toggle(&mut self, index: usize) -> bool {
        let old = self.bitvector[index / 64];
        self.bitvector[index / 64] ^= 1u64 << (index % 64);
        let went_up = self.bitvector[index / 64] > old;
        self.tree.add(index / (W * 64) + 1, if went_up { 1 } else { -1 });

        !went_up
    }

    /// Total heap footprint, in bits.
    pub fn bit_count(&self) -> usize {
        std::mem::size_of::<Self>() * 8 + self.bitvector.bit_count()
            - std::mem::size_of::<DArray<u64>>() * 8
            + self.tree.bit_count()
    }
}

//------------ Serialization -------------------------------------------------

impl<T, const W: usize> Wire for Stride<T, W>
where
    T: FenwickTree + Wire,
{
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.bitvector.len() as u64 * 64);
        for &word in self.bitvector.iter() {
            put_u64(out, word);
        }
        self.tree.write_to(out);
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let bits = take_u64(input)? as usize;
        let length = bits.div_ceil(64);
        let mut bitvector = DArray::new(length);
        for i in 0..length {
            bitvector[i] = take_u64(input)?;
        }
        let tree = T::read_from(input)?;
        if tree.size() != length / W + 1 {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { tree, bitvector })
    }
}
