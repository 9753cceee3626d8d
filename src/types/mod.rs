mod errors;

pub use errors::WireError;
