use log::{debug, trace};

use crate::common::{bound_bits, clear_rho, lambda, mask_rho, rho, BYTE_MASK};
use crate::darray::DArray;
use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{put_u64, take_u64, Wire};

//------------ ByteL ---------------------------------------------------------

/// Byte compression, level-ordered node layout. The only growable variant.
///
/// Every height owns its own byte region, so appending an element extends
/// exactly one region: the one of the new node's height. The node seed is
/// re-summed from its children in the lower regions; nothing else moves.
#[derive(Clone, Debug)]
pub struct ByteL<const BOUND: u64> {
    size: usize,
    levels: Vec<DArray<u8>>,
}

impl<const BOUND: u64> ByteL<BOUND> {
    pub const BOUNDSIZE: usize = bound_bits(BOUND);

    #[inline(always)]
    fn heightsize(height: usize) -> usize {
        ((height + Self::BOUNDSIZE - 1) >> 3) + 1
    }

    // Number of nodes of the given height in a tree of `size` elements.
    #[inline(always)]
    fn height_count(size: usize, height: usize) -> usize {
        (size + (1 << height)) >> (height + 1)
    }

    fn region_count(size: usize) -> usize {
        lambda(size as u64 + 1) + 1
    }

    // Masked insert of a node value; the bytes above the node within the
    // loaded word are preserved.
    fn write_node(region: &mut DArray<u8>, pos: usize, hsize: usize, value: u64) {
        let mask = BYTE_MASK[hsize];
        let word = region.read_word(pos);
        region.write_word(pos, (word & !mask) | (value & mask));
    }

    // Sum of the children chain of node `idx` with height `height`, read
    // from the lower regions. Seeds a node during construction and push.
    fn child_sum(levels: &[DArray<u8>], idx: usize, height: usize) -> u64 {
        let mut sum = 0;
        let mut child = idx - 1;
        for j in 0..height {
            child >>= 1;
            let jsize = Self::heightsize(j);
            sum += levels[j].read_word(child * jsize) & BYTE_MASK[jsize];
        }
        sum
    }

    /// Append one increment to the sequence.
    pub fn push(&mut self, inc: u64) {
        debug_assert!(inc <= BOUND);

        let idx = self.size + 1;
        let regions = Self::region_count(idx);
        while self.levels.len() < regions {
            debug!("bytel: opening region for height {}", self.levels.len());
            self.levels.push(DArray::new(0));
        }

        let height = rho(idx as u64);
        let hsize = Self::heightsize(height);
        let value = inc + Self::child_sum(&self.levels, idx, height);

        let pos = (idx >> (height + 1)) * hsize;
        let region = &mut self.levels[height];
        region.resize(pos + hsize);
        Self::write_node(region, pos, hsize, value);

        self.size = idx;
    }

    /// Drop the last element of the sequence. The summaries of all other
    /// elements are unchanged.
    ///
    /// # Panics
    ///
    /// If the tree is empty.
    pub fn pop(&mut self) {
        assert!(self.size > 0, "pop on an empty tree");

        let height = rho(self.size as u64);
        let hsize = Self::heightsize(height);
        let region = &mut self.levels[height];
        region.resize(region.len() - hsize);

        self.size -= 1;
        self.levels.truncate(Self::region_count(self.size));
    }

    /// Pre-allocate room for `space` more elements.
    pub fn reserve(&mut self, space: usize) {
        for (height, region) in self.levels.iter_mut().enumerate() {
            let nodes = (space >> (height + 1)) + 1;
            region.reserve(nodes * Self::heightsize(height));
        }
    }

    /// Give back excess capacity beyond the current size plus `space`
    /// elements.
    pub fn shrink(&mut self, space: usize) {
        for (height, region) in self.levels.iter_mut().enumerate() {
            let nodes = (space >> (height + 1)) + 1;
            let keep = region.len() + nodes * Self::heightsize(height);
            region.shrink_to(keep);
        }
    }
}

impl<const BOUND: u64> FenwickTree for ByteL<BOUND> {
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
        let regions = Self::region_count(size);
        let mut levels: Vec<DArray<u8>> = (0..regions)
            .map(|l| {
                DArray::new(
                    Self::height_count(size, l) * Self::heightsize(l),
                )
            })
            .collect();
        trace!(
            "bytel regions: {:?}",
            levels.iter().map(|l| l.len()).collect::<Vec<_>>()
        );

        for l in 0..regions {
            let hsize = Self::heightsize(l);
            let mut node = 1usize << l;
            while node <= size {
                let value = sequence[node - 1]
                    + Self::child_sum(&levels, node, l);
                let pos = (node >> (l + 1)) * hsize;
                Self::write_node(&mut levels[l], pos, hsize, value);
                node += 1 << (l + 1);
            }
        }

        Self { size, levels }
    }

    fn prefix(&self, idx: usize) -> u64 {
        assert!(idx <= self.size, "index out of range");
        let mut idx = idx;
        let mut sum = 0;

        while idx != 0 {
            let height = rho(idx as u64);
            let hsize = Self::heightsize(height);
            let pos = (idx >> (1 + height)) * hsize;

            sum += self.levels[height].read_word(pos) & BYTE_MASK[hsize];
            idx = clear_rho(idx as u64) as usize;
        }

        sum
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let mut idx = idx;

        while idx <= self.size {
            let height = rho(idx as u64);
            let pos = (idx >> (1 + height)) * Self::heightsize(height);

            self.levels[height].add_word(pos, inc as u64);
            idx += mask_rho(idx as u64) as usize;
        }
    }

    fn find(&self, val: &mut u64) -> usize {
        let mut node = 0;
        let mut idx = 0;

        for height in (0..self.levels.len()).rev() {
            let hsize = Self::heightsize(height);
            let pos = idx * hsize;

            idx <<= 1;

            if pos >= self.levels[height].len() {
                continue;
            }

            let value = self.levels[height].read_word(pos) & BYTE_MASK[hsize];

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

        for height in (0..self.levels.len()).rev() {
            let hsize = Self::heightsize(height);
            let pos = idx * hsize;

            idx <<= 1;

            if pos >= self.levels[height].len() {
                continue;
            }

            let value = (BOUND << height)
                - (self.levels[height].read_word(pos) & BYTE_MASK[hsize]);

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
            + self
                .levels
                .iter()
                .map(|region| region.bit_count())
                .sum::<usize>()
    }
}

//------------ Serialization -------------------------------------------------

impl<const BOUND: u64> Wire for ByteL<BOUND> {
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        put_u64(out, self.levels.len() as u64);
        for region in &self.levels {
            put_u64(out, region.len() as u64);
        }
        let total: usize = self.levels.iter().map(|r| r.len()).sum();
        put_u64(out, total as u64);
        for region in &self.levels {
            out.extend_from_slice(region);
        }
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        let size = take_u64(input)? as usize;
        let regions = take_u64(input)? as usize;
        if regions != Self::region_count(size) {
            return Err(WireError::LengthMismatch);
        }
        let mut lens = Vec::with_capacity(regions);
        for l in 0..regions {
            let len = take_u64(input)? as usize;
            if len != Self::height_count(size, l) * Self::heightsize(l) {
                return Err(WireError::LengthMismatch);
            }
            lens.push(len);
        }
        let total = take_u64(input)? as usize;
        if total != lens.iter().sum::<usize>() {
            return Err(WireError::LengthMismatch);
        }
        if input.len() < total {
            return Err(WireError::Truncated);
        }
        let mut levels = Vec::with_capacity(regions);
        for &len in &lens {
            let mut region = DArray::new(len);
            region.copy_from_slice(&input[..len]);
            *input = &input[len..];
            levels.push(region);
        }
        Ok(Self { size, levels })
    }
}
