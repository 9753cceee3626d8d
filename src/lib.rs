//! A library of compressed, searchable Fenwick trees and the rank/select
//! bitvector built on top of them.
//!
//! All tree variants answer the same four queries (`prefix`, `add`, `find`,
//! `comp_find`) over a bounded integer sequence; they differ only in how
//! nodes are packed and placed in memory.

pub use common::*;
pub use darray::DArray;
pub use fenwick::{
    BitF, BitL, ByteF, ByteL, FixedF, FixedL, Hybrid, TypeF, TypeL,
};
pub use rank_select::Stride;
pub use tree::FenwickTree;
pub use types::WireError;
pub use wire::Wire;

pub mod common;
pub mod darray;
pub mod fenwick;
pub mod rank_select;
pub mod tree;
pub mod types;
pub mod wire;
