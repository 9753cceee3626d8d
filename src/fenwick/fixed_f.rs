use crate::common::{
    bound_bits, clear_rho, mask_lambda, mask_rho, rho,
};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{put_u64, read_darray, take_u64, write_darray, Wire};

//------------ FixedF --------------------------------------------------------

/// No compression, classical node layout.
///
/// Every node is a full 64-bit word at a position derived from its natural
/// Fenwick index. The simplest and largest layout; the baseline the
/// compressed variants are measured against.
#[derive(Clone, Debug)]
pub struct FixedF<const BOUND: u64> {
    size: usize,
    tree: DArray<u64>,
}

impl<const BOUND: u64> FixedF<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    // Spread the nodes slightly so that the hot top-of-tree entries do not
    // all map to the same cache set on power-of-two sizes.
    #[inline(always)]
    fn pos(idx: usize) -> usize {
        idx + (idx * 3) / (16 * 1024)
    }
}

impl<const BOUND: u64> FenwickTree for FixedF<BOUND> {
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
        let mut tree = DArray::new(Self::pos(size) + 1);

        for (j, &inc) in sequence.iter().enumerate() {
            tree[Self::pos(j + 1)] = inc;
        }

        let mut m = 2;
        while m <= size {
            let mut idx = m;
            while idx <= size {
                tree[Self::pos(idx)] =
                    tree[Self::pos(idx)].wrapping_add(tree[Self::pos(idx - m / 2)]);
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
            sum += self.tree[Self::pos(idx)];
            idx = clear_rho(idx as u64) as usize;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            let node = &mut self.tree[Self::pos(idx)];
            *node = node.wrapping_add(inc as u64);
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
                let value = self.tree[Self::pos(node + m)];
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
                    - self.tree[Self::pos(node + m)];
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
            - std::mem::size_of::<DArray<u64>>() * 8
    }
}

//------------ Serialization -------------------------------------------------

impl<const BOUND: u64> Wire for FixedF<BOUND> {
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        write_darray(&self.tree, out);
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let size = take_u64(input)? as usize;
        let tree: DArray<u64> = read_darray(input)?;
        if tree.len() != Self::pos(size) + 1 {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { size, tree })
    }
}
