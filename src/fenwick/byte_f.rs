use crate::common::{
    bound_bits, clear_rho, mask_lambda, mask_rho, rho, BYTE_MASK,
};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{put_u64, read_darray, take_u64, write_darray, Wire};

//------------ ByteF ---------------------------------------------------------

/// Byte compression, classical node layout.
///
/// A node of height `h` occupies the smallest whole number of bytes that
/// holds `BOUNDSIZE + h` bits. Access is by unaligned 64-bit load, masked
/// down to the node's byte width with [`BYTE_MASK`].
#[derive(Clone, Debug)]
pub struct ByteF<const BOUND: u64> {
    size: usize,
    tree: DArray<u8>,
}

impl<const BOUND: u64> ByteF<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    const NEXTBYTE: usize = ((Self::BOUNDSIZE - 1) | (8 - 1)) + 1;
    const SMALL: usize = ((Self::BOUNDSIZE - 1) >> 3) + 1;
    const MEDIUM: usize = Self::NEXTBYTE - Self::BOUNDSIZE + 1;
    const LARGE: usize = Self::MEDIUM + 8;
    const MULTIPLIER: usize = 8 - Self::SMALL - 1;

    #[inline(always)]
    fn bytesize(idx: usize) -> usize {
        ((rho(idx as u64) + Self::BOUNDSIZE - 1) >> 3) + 1
    }

    // Blow a few padding bytes every 16Ki nodes so that the periodic node
    // pattern does not land on the same page offsets forever.
    #[inline(always)]
    fn holes(idx: usize) -> usize {
        (idx >> 14) * 8
    }

    // Byte offset of the storage of node idx + 1. Injective and monotone;
    // derived from how many one-, two-, ... byte nodes precede it.
    #[inline(always)]
    fn pos(idx: usize) -> usize {
        idx * Self::SMALL
            + (idx >> Self::MEDIUM)
            + (idx >> Self::LARGE) * Self::MULTIPLIER
            + Self::holes(idx)
    }
}

impl<const BOUND: u64> FenwickTree for ByteF<BOUND> {
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
        let mut tree = DArray::new(Self::pos(size));

        for (i, &inc) in sequence.iter().enumerate() {
            let idx = i + 1;
            let pos = Self::pos(idx - 1);
            let mask = BYTE_MASK[Self::bytesize(idx)];

            let word = tree.read_word(pos);
            tree.write_word(pos, (word & !mask) | (inc & mask));
        }

        let mut m = 2;
        while m <= size {
            let mut idx = m;
            while idx <= size {
                let right = tree.read_word(Self::pos(idx - m / 2 - 1))
                    & BYTE_MASK[Self::bytesize(idx - m / 2)];
                tree.add_word(Self::pos(idx - 1), right);
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
            let element = self.tree.read_word(Self::pos(idx - 1));
            sum += element & BYTE_MASK[Self::bytesize(idx)];
            idx = clear_rho(idx as u64) as usize;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            self.tree.add_word(Self::pos(idx - 1), inc as u64);
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
                let value = self.tree.read_word(Self::pos(node + m - 1))
                    & BYTE_MASK[Self::bytesize(node + m)];
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
                let value = (BOUND << rho((node + m) as u64))
                    - (self.tree.read_word(Self::pos(node + m - 1))
                        & BYTE_MASK[Self::bytesize(node + m)]);
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

impl<const BOUND: u64> Wire for ByteF<BOUND> {
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        write_darray(&self.tree, out);
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let size = take_u64(input)? as usize;
        let tree: DArray<u8> = read_darray(input)?;
        if tree.len() != Self::pos(size) {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { size, tree })
    }
}
