mod stride;

pub use stride::Stride;
