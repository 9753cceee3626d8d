use log::trace;

use crate::common::{
    bound_bits, compact_bitmask, lambda, mask_lambda, mask_rho, rho,
};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{
    put_u64, read_darray, read_level_table, take_u64, write_darray,
    write_level_table, Wire,
};

//------------ BitL ----------------------------------------------------------

/// Bit compression, level-ordered node layout.
///
/// A node of height `h` occupies exactly `BOUNDSIZE + h` bits and all nodes
/// of one height are packed back-to-back in their own slice of the buffer.
/// The tightest layout in the family.
#[derive(Clone, Debug)]
pub struct BitL<const BOUND: u64> {
    size: usize,
    tree: DArray<u8>,
    level: Box<[usize]>,
}

impl<const BOUND: u64> BitL<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    // Bit offsets of each height's slice: height h covers the bit range
    // level[h]..level[h + 1], with every node BOUNDSIZE + h bits wide.
    fn level_table(size: usize) -> Box<[usize]> {
        let levels = lambda(size as u64 + 1) + 2;
        let mut level = vec![0usize; levels];
        for i in 1..levels {
            level[i] = ((size + (1 << (i - 1))) >> i)
                * (Self::BOUNDSIZE - 1 + i)
                + level[i - 1];
        }
        level.into_boxed_slice()
    }

    #[inline(always)]
    fn node_bitpos(&self, idx: usize) -> (usize, usize) {
        let height = rho(idx as u64);
        let bitpos = self.level[height]
            + (Self::BOUNDSIZE + height) * (idx >> (1 + height));
        (bitpos, height)
    }
}

impl<const BOUND: u64> FenwickTree for BitL<BOUND> {
    const BOUND: u64 = BOUND;

    fn new(sequence: &[u64]) -> Self {
        const {
            assert!(
                bound_bits(BOUND) >= 1 && bound_bits(BOUND) <= 64,
                "leaves must fit in a 64-bit word"
            )
        };
        debug_assert!(sequence.iter().all(|&v| v <= BOUND));

        let size = sequence.len();
        let level = Self::level_table(size);
        let levels = level.len();
        trace!("bitl level table: {:?}", level);

        let mut tree = DArray::new(level[levels - 1] / 8 + 1);

        for l in 0..levels - 1 {
            let width = Self::BOUNDSIZE + l;
            let mut node = 1usize << l;
            while node <= size {
                let mut value = sequence[node - 1];

                let mut child = node - 1;
                for j in 0..l {
                    child >>= 1;
                    let child_bitpos =
                        level[j] + (Self::BOUNDSIZE + j) * child;
                    let child_shift = child_bitpos & 0b111;
                    let child_mask = compact_bitmask(
                        Self::BOUNDSIZE + j,
                        child_shift,
                    );
                    value += (tree.read_word(child_bitpos / 8) & child_mask)
                        >> child_shift;
                }

                let bitpos = level[l] + width * (node >> (l + 1));
                let shift = bitpos & 0b111;
                let mask = compact_bitmask(width, shift);
                let word = tree.read_word(bitpos / 8);
                tree.write_word(
                    bitpos / 8,
                    (word & !mask) | ((value << shift) & mask),
                );

                node += 1 << (l + 1);
            }
        }

        Self { size, tree, level }
    }

    fn prefix(&self, idx: usize) -> u64 {
        assert!(idx <= self.size, "index out of range");
        let mut sum = 0;
        let mut index = 0;

        // Top-down: peel off the highest differing bit each round, so the
        // nodes are visited in descending height order.
        while idx != index {
            index += mask_lambda((idx ^ index) as u64) as usize;

            let (bitpos, height) = self.node_bitpos(index);
            let shift = bitpos & 0b111;
            let mask = compact_bitmask(Self::BOUNDSIZE + height, shift);

            sum += (self.tree.read_word(bitpos / 8) & mask) >> shift;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            let (bitpos, _) = self.node_bitpos(idx);
            let shift = bitpos & 0b111;

            self.tree.add_word(bitpos / 8, (inc as u64) << shift);
            idx += mask_rho(idx as u64) as usize;
        }
    }

    fn find(&self, val: &mut u64) -> usize {
        let mut node = 0;
        let mut idx = 0;

        for height in (0..self.level.len() - 1).rev() {
            let width = Self::BOUNDSIZE + height;
            let bitpos = self.level[height] + width * idx;
            let shift = bitpos & 0b111;
            let mask = compact_bitmask(width, 0);

            idx <<= 1;

            if bitpos >= self.level[height + 1] {
                continue;
            }

            let value = (self.tree.read_word(bitpos / 8) >> shift) & mask;

            if *val >= value {
                idx += 1;
                *val -= value;
                node += 1 << height;
            }
        }

        node.min(self.size)
    }

    fn comp_find(&self, val: &mut u64) -> usize {
        let mut node = 0;
        let mut idx = 0;

        for height in (0..self.level.len() - 1).rev() {
            let width = Self::BOUNDSIZE + height;
            let bitpos = self.level[height] + width * idx;
            let shift = bitpos & 0b111;
            let mask = compact_bitmask(width, 0);

            idx <<= 1;

            if bitpos >= self.level[height + 1] {
                continue;
            }

            let value = (BOUND << height)
                - ((self.tree.read_word(bitpos / 8) >> shift) & mask);

            if *val >= value {
                idx += 1;
                *val -= value;
                node += 1 << height;
            }
        }

        node.min(self.size)
    }

    fn size(&self) -> usize {
        self.size
    }

    fn bit_count(&self) -> usize {
        std::mem::size_of::<Self>() * 8 + self.tree.bit_count()
            - std::mem::size_of::<DArray<u8>>() * 8
            + self.level.len() * std::mem::size_of::<usize>() * 8
    }
}

//------------ Serialization -------------------------------------------------

impl<const BOUND: u64> Wire for BitL<BOUND> {
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        write_level_table(&self.level, out);
        write_darray(&self.tree, out);
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let size = take_u64(input)? as usize;
        let level = read_level_table(input)?;
        if level != Self::level_table(size) {
            return Err(WireError::LengthMismatch);
        }
        let tree: DArray<u8> = read_darray(input)?;
        if tree.len() != level[level.len() - 1] / 8 + 1 {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { size, tree, level })
    }
}
