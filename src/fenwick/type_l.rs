use log::trace;

use crate::common::{bound_bits, clear_rho, lambda, mask_rho, rho};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{
    put_u64, read_darray, read_level_table, take_u64, write_darray,
    write_level_table, Wire,
};

//------------ TypeL ---------------------------------------------------------

/// Type compression, level-ordered node layout.
///
/// Like [`TypeF`][super::TypeF], every node is the smallest power-of-two-byte
/// integer wide enough for its height, but the levels are stored
/// contiguously. The level table restarts at zero whenever the height range
/// crosses into the next wider type: an entry is an offset into the typed
/// array its height routes to.
#[derive(Clone, Debug)]
pub struct TypeL<const BOUND: u64> {
    size: usize,
    tree8: DArray<u8>,
    tree16: DArray<u16>,
    tree64: DArray<u64>,
    level: Box<[usize]>,
}

impl<const BOUND: u64> TypeL<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    #[inline(always)]
    fn height_count(size: usize, height: usize) -> usize {
        (size + (1 << height)) >> (height + 1)
    }

    // The level table plus the number of nodes each typed array holds.
    fn level_table(size: usize) -> (Box<[usize]>, [usize; 3]) {
        let bs = Self::BOUNDSIZE;
        let levels = lambda(size as u64 + 1) + 2;
        let mut level = vec![0usize; levels];
        let mut type_end = [0usize; 3];

        let mut j = if bs <= 8 {
            0
        } else if bs <= 16 {
            1
        } else {
            2
        };
        for i in 1..levels {
            level[i] = Self::height_count(size, i - 1) + level[i - 1];
            type_end[j] = level[i];

            // Next height routes to the next wider type; its offsets
            // restart at the front of that array.
            if (bs <= 8 && i - 1 == 8 - bs)
                || (bs <= 16 && i - 1 == 16 - bs)
            {
                level[i] = 0;
                j += 1;
            }
        }

        (level.into_boxed_slice(), type_end)
    }

    #[inline(always)]
    fn get_level_node(&self, height: usize, tree_idx: usize) -> u64 {
        match height + Self::BOUNDSIZE {
            1..=8 => self.tree8[tree_idx] as u64,
            9..=16 => self.tree16[tree_idx] as u64,
            _ => self.tree64[tree_idx],
        }
    }

    #[inline(always)]
    fn set_level_node(&mut self, height: usize, tree_idx: usize, value: u64) {
        match height + Self::BOUNDSIZE {
            1..=8 => self.tree8[tree_idx] = value as u8,
            9..=16 => self.tree16[tree_idx] = value as u16,
            _ => self.tree64[tree_idx] = value,
        }
    }

    #[inline(always)]
    fn add_level_node(&mut self, height: usize, tree_idx: usize, delta: u64) {
        match height + Self::BOUNDSIZE {
            1..=8 => {
                let node = &mut self.tree8[tree_idx];
                *node = node.wrapping_add(delta as u8);
            }
            9..=16 => {
                let node = &mut self.tree16[tree_idx];
                *node = node.wrapping_add(delta as u16);
            }
            _ => {
                let node = &mut self.tree64[tree_idx];
                *node = node.wrapping_add(delta);
            }
        }
    }
}

impl<const BOUND: u64> FenwickTree for TypeL<BOUND> {
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
        let (level, type_end) = Self::level_table(size);
        let levels = level.len();
        trace!("typel level table: {:?}, type ends: {:?}", level, type_end);

        let mut tree = Self {
            size,
            tree8: DArray::new(type_end[0]),
            tree16: DArray::new(type_end[1]),
            tree64: DArray::new(type_end[2]),
            level,
        };

        for l in 0..levels - 1 {
            let mut node = 1usize << l;
            while node <= size {
                let mut value = sequence[node - 1];

                let mut child = node - 1;
                for j in 0..l {
                    child >>= 1;
                    value +=
                        tree.get_level_node(j, tree.level[j] + child);
                }

                let tree_idx = tree.level[l] + (node >> (l + 1));
                tree.set_level_node(l, tree_idx, value);
                node += 1 << (l + 1);
            }
        }

        tree
    }

    fn prefix(&self, idx: usize) -> u64 {
        assert!(idx <= self.size, "index out of range");
        let mut idx = idx;
        let mut sum = 0;

        while idx != 0 {
            let height = rho(idx as u64);
            let tree_idx = self.level[height] + (idx >> (1 + height));

            sum += self.get_level_node(height, tree_idx);
            idx = clear_rho(idx as u64) as usize;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            let height = rho(idx as u64);
            let tree_idx = self.level[height] + (idx >> (1 + height));

            self.add_level_node(height, tree_idx, inc as u64);
            idx += mask_rho(idx as u64) as usize;
        }
    }

    fn find(&self, val: &mut u64) -> usize {
        let mut node = 0;
        let mut idx = 0;

        for height in (0..self.level.len() - 1).rev() {
            let level_idx = idx;

            idx <<= 1;

            if level_idx >= Self::height_count(self.size, height) {
                continue;
            }

            let value = self
                .get_level_node(height, self.level[height] + level_idx);

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
            let level_idx = idx;

            idx <<= 1;

            if level_idx >= Self::height_count(self.size, height) {
                continue;
            }

            let value = (BOUND << height)
                - self
                    .get_level_node(height, self.level[height] + level_idx);

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
        std::mem::size_of::<Self>() * 8
            + self.tree8.bit_count()
            + self.tree16.bit_count()
            + self.tree64.bit_count()
            - 3 * std::mem::size_of::<DArray<u8>>() * 8
            + self.level.len() * std::mem::size_of::<usize>() * 8
    }
}

//------------ Serialization -------------------------------------------------

impl<const BOUND: u64> Wire for TypeL<BOUND> {
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        write_level_table(&self.level, out);
        write_darray(&self.tree8, out);
        write_darray(&self.tree16, out);
        write_darray(&self.tree64, out);
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let size = take_u64(input)? as usize;
        let level = read_level_table(input)?;
        let (expected, type_end) = Self::level_table(size);
        if level != expected {
            return Err(WireError::LengthMismatch);
        }
        let tree8: DArray<u8> = read_darray(input)?;
        let tree16: DArray<u16> = read_darray(input)?;
        let tree64: DArray<u64> = read_darray(input)?;
        if tree8.len() != type_end[0]
            || tree16.len() != type_end[1]
            || tree64.len() != type_end[2]
        {
            return Err(WireError::LengthMismatch);
        }
        Ok(Self { size, tree8, tree16, tree64, level })
    }
}
