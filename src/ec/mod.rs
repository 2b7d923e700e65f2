mod galois;
mod rs;

pub(crate) use galois::GaloisField;
pub use rs::ReedSolomon;

/// Symbol size used by the transfer layer; one byte per symbol.
pub const TRANSFER_SYMBOL_SIZE: u32 = 8;
