use cid::CidGeneric;
use thiserror::Error;

/// Error returned when a CID can't be computed for the data, or when a CID doesn't address
/// the kind of data the caller expects.
///
/// The variants describe a mismatch with a particular [`Block`] type, not necessarily a
/// malformed CID.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CidError {
    /// CID uses a codec other than the expected one.
    #[error("Invalid CID codec {0}")]
    InvalidCidCodec(u64),

    /// Multihash digest has an unexpected size.
    #[error("Invalid multihash length {0}")]
    InvalidMultihashLength(usize),

    /// Multihash uses a code other than the expected one.
    #[error("Invalid multihash code {0} expected {1}")]
    InvalidMultihashCode(u64, u64),

    /// Data can't be encoded or decoded as this kind of block.
    #[error("Invalid data format {0}")]
    InvalidDataFormat(String),

    /// CID is well formed but doesn't match the data.
    #[error("Invalid CID: {0}")]
    InvalidCid(String),
}

/// Data which knows the CID it is stored under.
pub trait Block<const S: usize>: Sync + Send {
    /// Compute the CID of the block.
    fn cid(&self) -> Result<CidGeneric<S>, CidError>;

    /// Raw bytes of the block.
    fn data(&self) -> &[u8];
}
