use log::trace;

use crate::common::{bound_bits, clear_rho, lambda, mask_rho, rho};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{
    put_u64, read_darray, read_level_table, take_u64, write_darray,
    write_level_table, Wire,
};

//------------ FixedL --------------------------------------------------------

/// No compression, level-ordered node layout.
///
/// Every node is a full 64-bit word, but all nodes of the same height are
/// stored contiguously. The `find` descent touches exactly one node per
/// height, so each step stays within a single region.
#[derive(Clone, Debug)]
pub struct FixedL<const BOUND: u64> {
    size: usize,
    tree: DArray<u64>,
    level: Box<[usize]>,
}

impl<const BOUND: u64> FixedL<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    // Word offsets of each height's region: level[h] is where height h
    // starts, level[h + 1] where it ends.
    fn level_table(size: usize) -> Box<[usize]> {
        let levels = lambda(size as u64 + 1) + 2;
        let mut level = vec![0usize; levels];
        for i in 1..levels {
            level[i] = ((size + (1 << (i - 1))) >> i) + level[i - 1];
        }
        level.into_boxed_slice()
    }

    #[inline(always)]
    fn node_pos(&self, idx: usize) -> usize {
        let height = rho(idx as u64);
        self.level[height] + (idx >> (1 + height))
    }
}

impl<const BOUND: u64> FenwickTree for FixedL<BOUND> {
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
        trace!("fixed level table: {:?}", level);

        let mut tree = DArray::new(level[levels - 1]);

        for l in 0..levels - 1 {
            let mut node = 1usize << l;
            while node <= size {
                let mut value = sequence[node - 1];

                // Sum up the children chain from the lower regions.
                let mut child = node - 1;
                for j in 0..l {
                    child >>= 1;
                    value += tree[level[j] + child];
                }

                tree[level[l] + (node >> (l + 1))] = value;
                node += 1 << (l + 1);
            }
        }

        Self { size, tree, level }
    }

    fn prefix(&self, idx: usize) -> u64 {
        assert!(idx <= self.size, "index out of range");
        let mut idx = idx;
        let mut sum = 0;

        while idx != 0 {
            sum += self.tree[self.node_pos(idx)];
            idx = clear_rho(idx as u64) as usize;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            let pos = self.node_pos(idx);
            self.tree[pos] = self.tree[pos].wrapping_add(inc as u64);
            idx += mask_rho(idx as u64) as usize;
        }
    }

    fn find(&self, val: &mut u64) -> usize {
        let mut node = 0;
        let mut idx = 0;

        for height in (0..self.level.len() - 1).rev() {
            let pos = self.level[height] + idx;

            idx <<= 1;

            if pos >= self.level[height + 1] {
                continue;
            }

            let value = self.tree[pos];

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
            let pos = self.level[height] + idx;

            idx <<= 1;

            if pos >= self.level[height + 1] {
                continue;
            }

            let value = (BOUND << height) - self.tree[pos];

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
            - std::mem::size_of::<DArray<u64>>() * 8
            + self.level.len() * std::mem::size_of::<usize>() * 8
    }
}

//------------ Serialization -------------------------------------------------

impl<const BOUND: u64> Wire for FixedL<BOUND> {
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
        let tree: DArray<u64> = read_darray(input)?;
        if tree.len() != level[level.len() - 1] {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { size, tree, level })
    }
}
