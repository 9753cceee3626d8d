use crate::common::{
    bound_bits, clear_rho, compact_bitmask, mask_lambda, mask_rho, popcount,
    rho,
};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{put_u64, read_darray, take_u64, write_darray, Wire};

//------------ BitF ----------------------------------------------------------

/// Bit compression, classical node layout.
///
/// A node of height `h` occupies exactly `BOUNDSIZE + h` bits, packed
/// back-to-back. The cumulative bit offset of a node has a closed form
/// because `rho` sums to a popcount along the index sequence.
#[derive(Clone, Debug)]
pub struct BitF<const BOUND: u64> {
    size: usize,
    tree: DArray<u8>,
}

impl<const BOUND: u64> BitF<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    // Bit offset of the storage of node n + 1.
    #[inline(always)]
    fn bitpos(n: usize) -> usize {
        (Self::BOUNDSIZE + 1) * n - popcount(n as u64)
    }
}

impl<const BOUND: u64> FenwickTree for BitF<BOUND> {
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
        let mut tree = DArray::new(Self::bitpos(size) / 8 + 1);

        for (i, &inc) in sequence.iter().enumerate() {
            let idx = i + 1;
            let bitpos = Self::bitpos(idx - 1);
            let shift = bitpos & 0b111;
            let bitsize = Self::BOUNDSIZE + rho(idx as u64);
            let mask = compact_bitmask(bitsize, shift);

            let word = tree.read_word(bitpos / 8);
            tree.write_word(bitpos / 8, (word & !mask) | ((inc << shift) & mask));
        }

        let mut m = 2;
        while m <= size {
            let mut idx = m;
            while idx <= size {
                let right_bitpos = Self::bitpos(idx - m / 2 - 1);
                let right_shift = right_bitpos & 0b111;
                let right_bitsize =
                    Self::BOUNDSIZE + rho((idx - m / 2) as u64);
                let right_mask = compact_bitmask(right_bitsize, right_shift);

                let value = (tree.read_word(right_bitpos / 8) & right_mask)
                    >> right_shift;

                let left_bitpos = Self::bitpos(idx - 1);
                let left_shift = left_bitpos & 0b111;
                tree.add_word(left_bitpos / 8, value << left_shift);

                idx += m;
            }
            m <<= 1;
        }

        Self { size, tree }
    }

    fn prefix(&self, idx: usize) -> u64 {
        assert!(idx <= self.size, "index out of range");
        let mut idx = idx;
        let mut sum = 0;

        while idx != 0 {
            let bitpos = Self::bitpos(idx - 1);
            let height = rho(idx as u64);
            let shift = bitpos & 0b111;
            let mask = compact_bitmask(Self::BOUNDSIZE + height, shift);

            sum += (self.tree.read_word(bitpos / 8) & mask) >> shift;
            idx = clear_rho(idx as u64) as usize;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            let bitpos = Self::bitpos(idx - 1);
            let shift = bitpos & 0b111;

            self.tree.add_word(bitpos / 8, (inc as u64) << shift);
            idx += mask_rho(idx as u64) as usize;
        }
    }

    fn find(&self, val: &mut u64) -> usize {
        if self.size == 0 {
            return 0;
        }
        let mut node = 0;

        let mut m = mask_lambda(self.size as u64) as usize;
        while m != 0 {
            if node + m <= self.size {
                let bitpos = Self::bitpos(node + m - 1);
                let height = rho((node + m) as u64);
                let shift = bitpos & 0b111;
                let mask = compact_bitmask(Self::BOUNDSIZE + height, 0);

                let value =
                    (self.tree.read_word(bitpos / 8) >> shift) & mask;

                if *val >= value {
                    node += m;
                    *val -= value;
                }
            }
            m >>= 1;
        }

        node
    }

    fn comp_find(&self, val: &mut u64) -> usize {
        if self.size == 0 {
            return 0;
        }
        let mut node = 0;

        let mut m = mask_lambda(self.size as u64) as usize;
        while m != 0 {
            if node + m <= self.size {
                let bitpos = Self::bitpos(node + m - 1);
                let height = rho((node + m) as u64);
                let shift = bitpos & 0b111;
                let mask = compact_bitmask(Self::BOUNDSIZE + height, 0);

                let value = (BOUND << height)
                    - ((self.tree.read_word(bitpos / 8) >> shift) & mask);

                if *val >= value {
                    node += m;
                    *val -= value;
                }
            }
            m >>= 1;
        }

        node
    }

    fn size(&self) -> usize {
        self.size
    }

    fn bit_count(&self) -> usize {
        std::mem::size_of::<Self>() * 8 + self.tree.bit_count()
            - std::mem::size_of::<DArray<u8>>() * 8
    }
}

//------------ Serialization -------------------------------------------------

impl<const BOUND: u64> Wire for BitF<BOUND> {
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        write_darray(&self.tree, out);
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let size = take_u64(input)? as usize;
        let tree: DArray<u8> = read_darray(input)?;
        if tree.len() != Self::bitpos(size) / 8 + 1 {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { size, tree })
    }
}
