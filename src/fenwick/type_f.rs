use crate::common::{bound_bits, clear_rho, mask_lambda, mask_rho, rho};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{put_u64, read_darray, take_u64, write_darray, Wire};

//------------ TypeF ---------------------------------------------------------

/// Type compression, classical node layout.
///
/// A node lives in the smallest power-of-two-byte integer wide enough for
/// its height: u8, u16 or u64, in three parallel arrays. No unaligned
/// access; the price is a type switch on every node visit.
///
/// The position of a node inside its typed array has a closed form: the
/// number of indices up to it whose height falls in the same width class,
/// which is a difference of two shifts.
#[derive(Clone, Debug)]
pub struct TypeF<const BOUND: u64> {
    size: usize,
    tree8: DArray<u8>,
    tree16: DArray<u16>,
    tree64: DArray<u64>,
}

impl<const BOUND: u64> TypeF<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    // Heights below T8 fit in a u8, heights below T16 in a u16.
    const T8: usize = {
        let bs = bound_bits(BOUND);
        if bs < 9 {
            9 - bs
        } else {
            0
        }
    };
    const T16: usize = {
        let bs = bound_bits(BOUND);
        if bs < 17 {
            17 - bs
        } else {
            0
        }
    };

    // How many of the indices 1..=idx store their node as u8/u16/u64.
    #[inline(always)]
    fn count8(idx: usize) -> usize {
        idx - (idx >> Self::T8)
    }

    #[inline(always)]
    fn count16(idx: usize) -> usize {
        (idx >> Self::T8) - (idx >> Self::T16)
    }

    #[inline(always)]
    fn count64(idx: usize) -> usize {
        idx >> Self::T16
    }

    #[inline(always)]
    fn get_node(&self, idx: usize) -> u64 {
        match rho(idx as u64) + Self::BOUNDSIZE {
            1..=8 => self.tree8[Self::count8(idx) - 1] as u64,
            9..=16 => self.tree16[Self::count16(idx) - 1] as u64,
            _ => self.tree64[Self::count64(idx) - 1],
        }
    }

    #[inline(always)]
    fn set_node(&mut self, idx: usize, value: u64) {
        match rho(idx as u64) + Self::BOUNDSIZE {
            1..=8 => self.tree8[Self::count8(idx) - 1] = value as u8,
            9..=16 => self.tree16[Self::count16(idx) - 1] = value as u16,
            _ => self.tree64[Self::count64(idx) - 1] = value,
        }
    }

    // Wrapping add; a two's-complement delta carries signed increments.
    #[inline(always)]
    fn add_node(&mut self, idx: usize, delta: u64) {
        match rho(idx as u64) + Self::BOUNDSIZE {
            1..=8 => {
                let node = &mut self.tree8[Self::count8(idx) - 1];
                *node = node.wrapping_add(delta as u8);
            }
            9..=16 => {
                let node = &mut self.tree16[Self::count16(idx) - 1];
                *node = node.wrapping_add(delta as u16);
            }
            _ => {
                let node = &mut self.tree64[Self::count64(idx) - 1];
                *node = node.wrapping_add(delta);
            }
        }
    }
}

impl<const BOUND: u64> FenwickTree for TypeF<BOUND> {
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
        let mut tree = Self {
            size,
            tree8: DArray::new(Self::count8(size)),
            tree16: DArray::new(Self::count16(size)),
            tree64: DArray::new(Self::count64(size)),
        };

        for (j, &inc) in sequence.iter().enumerate() {
            tree.set_node(j + 1, inc);
        }

        let mut m = 2;
        while m <= size {
            let mut idx = m;
            while idx <= size {
                let value = tree.get_node(idx - m / 2);
                tree.add_node(idx, value);
                idx += m;
            }
            m <<= 1;
        }

        tree
    }

    fn prefix(&self, idx: usize) -> u64 {
        assert!(idx <= self.size, "index out of range");
        let mut idx = idx;
        let mut sum = 0;

        while idx != 0 {
            sum += self.get_node(idx);
            idx = clear_rho(idx as u64) as usize;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            self.add_node(idx, inc as u64);
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
                let value = self.get_node(node + m);
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
                    - self.get_node(node + m);
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
        std::mem::size_of::<Self>() * 8
            + self.tree8.bit_count()
            + self.tree16.bit_count()
            + self.tree64.bit_count()
            - 3 * std::mem::size_of::<DArray<u8>>() * 8
    }
}

//------------ Serialization -------------------------------------------------

impl<const BOUND: u64> Wire for TypeF<BOUND> {
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        write_darray(&self.tree8, out);
        write_darray(&self.tree16, out);
        write_darray(&self.tree64, out);
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let size = take_u64(input)? as usize;
        let tree8: DArray<u8> = read_darray(input)?;
        let tree16: DArray<u16> = read_darray(input)?;
        let tree64: DArray<u64> = read_darray(input)?;
        if tree8.len() != Self::count8(size)
            || tree16.len() != Self::count16(size)
            || tree64.len() != Self::count64(size)
        {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { size, tree8, tree16, tree64 })
    }
}
