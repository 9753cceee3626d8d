//! The eight tree layouts and their composition.
//!
//! Naming: the first half is the node encoding (`Fixed` 64-bit words,
//! `Byte` whole bytes, `Bit` exact bits, `Type` smallest machine integer),
//! the second half the placement (`F` classical Fenwick order, `L`
//! level-ordered).

mod bit_f;
mod bit_l;
mod byte_f;
mod byte_l;
mod fixed_f;
mod fixed_l;
mod hybrid;
mod type_f;
mod type_l;

pub use bit_f::BitF;
pub use bit_l::BitL;
pub use byte_f::ByteF;
pub use byte_l::ByteL;
pub use fixed_f::FixedF;
pub use fixed_l::FixedL;
pub use hybrid::Hybrid;
pub use type_f::TypeF;
pub use type_l::TypeL;
