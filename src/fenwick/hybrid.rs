use crate::tree::FenwickTree;
use crate::types::WireError;
use crate::wire::{put_u64, take_u64, Wire};

//------------ Hybrid --------------------------------------------------------

/// A two-layer composition of tree layouts.
///
/// The sequence is chopped into blocks of `2^HEIGHT - 1` elements plus one
/// block-closing element. Each block gets its own bottom tree of type `B`;
/// the closing elements, with the block totals folded in, live in a single
/// top tree of type `T`. A query splits its index: the high bits address the
/// top tree, the low bits the block's bottom tree.
///
/// `T` must be instantiated with bound `BOUND << HEIGHT` (the worst-case
/// block total) and `B` with `BOUND`; this is asserted at construction,
/// since the type system cannot tie the two const parameters together.
#[derive(Clone, Debug)]
pub struct Hybrid<T, B, const BOUND: u64, const HEIGHT: u32> {
    size: usize,
    top: T,
    bottom: Vec<B>,
}

impl<T, B, const BOUND: u64, const HEIGHT: u32> Hybrid<T, B, BOUND, HEIGHT>
where
    T: FenwickTree,
    B: FenwickTree,
{
    /// Elements per bottom tree; one less than the block length.
    const BOTTOM_ELEMENTS: usize = (1usize << HEIGHT) - 1;

    fn check_bounds() {
        const {
            assert!(HEIGHT >= 1 && HEIGHT < 64, "invalid bottom height")
        };
        assert_eq!(B::BOUND, BOUND, "bottom tree bound mismatch");
        assert_eq!(
            T::BOUND,
            BOUND << HEIGHT,
            "top tree bound must cover a full block"
        );
    }
}

impl<T, B, const BOUND: u64, const HEIGHT: u32> FenwickTree
    for Hybrid<T, B, BOUND, HEIGHT>
where
    T: FenwickTree,
    B: FenwickTree,
{
    const BOUND: u64 = BOUND;

    fn new(sequence: &[u64]) -> Self {
        Self::check_bounds();

        let size = sequence.len();
        let top_len = size >> HEIGHT;

        // The block-closing elements seed the top tree.
        let closers: Vec<u64> = (1..=top_len)
            .map(|i| sequence[i * (Self::BOTTOM_ELEMENTS + 1) - 1])
            .collect();
        let mut top = T::new(&closers);

        let mut bottom = Vec::with_capacity(top_len + 1);
        for i in 0..=top_len {
            let start = (Self::BOTTOM_ELEMENTS + 1) * i;
            let len = if start + Self::BOTTOM_ELEMENTS <= size {
                Self::BOTTOM_ELEMENTS
            } else {
                size & Self::BOTTOM_ELEMENTS
            };
            bottom.push(B::new(&sequence[start..start + len]));
        }

        // Fold each block total into its closing top node.
        for (i, tree) in bottom.iter().enumerate().take(top_len) {
            top.add(i + 1, tree.prefix(tree.size()) as i64);
        }

        Self { size, top, bottom }
    }

    fn prefix(&self, idx: usize) -> u64 {
        assert!(idx <= self.size, "index out of range");
        let top = idx >> HEIGHT;
        let bottom = idx & Self::BOTTOM_ELEMENTS;

        self.top.prefix(top) + self.bottom[top].prefix(bottom)
    }

    fn add(&mut self, idx: usize, inc: i64) {
        assert!(idx >= 1 && idx <= self.size, "index out of range");
        let top = idx >> HEIGHT;
        let bottom = idx & Self::BOTTOM_ELEMENTS;

        if bottom == 0 {
            // A block-closing element lives in the top tree only.
            self.top.add(top, inc);
        } else {
            self.top.add(top + 1, inc);
            self.bottom[top].add(bottom, inc);
        }
    }

    fn find(&self, val: &mut u64) -> usize {
        let top = if self.top.size() != 0 {
            self.top.find(val)
        } else {
            0
        };
        let bottom = if top < self.bottom.len() {
            self.bottom[top].find(val)
        } else {
            0
        };

        (top << HEIGHT) + bottom
    }

    fn comp_find(&self, val: &mut u64) -> usize {
        let top = if self.top.size() != 0 {
            self.top.comp_find(val)
        } else {
            0
        };
        let bottom = if top < self.bottom.len() {
            self.bottom[top].comp_find(val)
        } else {
            0
        };

        (top << HEIGHT) + bottom
    }

    fn size(&self) -> usize {
        self.size
    }

    fn bit_count(&self) -> usize {
        std::mem::size_of::<Self>() * 8
            + self.top.bit_count()
            + self
                .bottom
                .iter()
                .map(|tree| tree.bit_count())
                .sum::<usize>()
    }
}

//------------ Serialization -------------------------------------------------

impl<T, B, const BOUND: u64, const HEIGHT: u32> Wire
    for Hybrid<T, B, BOUND, HEIGHT>
where
    T: FenwickTree + Wire,
    B: FenwickTree + Wire,
{
    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.size as u64);
        self.top.write_to(out);
        for tree in &self.bottom {
            tree.write_to(out);
        }
    }

    fn read_from(input: &mut &[u8]) -> Result<Self, WireError> {
        Self::check_bounds();

        let size = take_u64(input)? as usize;
        let top_len = size >> HEIGHT;
        let top = T::read_from(input)?;
        if top.size() != top_len {
            return Err(WireError::LengthMismatch);
        }
        let mut bottom = Vec::with_capacity(top_len + 1);
        for _ in 0..=top_len {
            bottom.push(B::read_from(input)?);
        }
        Ok(Self { size, top, bottom })
    }
}
