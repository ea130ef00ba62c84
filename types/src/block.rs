use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::nmt::NamespacedHash;
use crate::{
    bail_validation, DataAvailabilityHeader, ExtendedDataSquare, ExtendedHeader, Result, Share,
};

/// Minimal consensus header of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHeader {
    /// Height of the block.
    pub height: u64,
    /// Commitment to the block data, the hash of its [`DataAvailabilityHeader`].
    ///
    /// [`Hash::None`] means that the data isn't committed to.
    pub data_hash: Hash,
}

/// Block as produced by the consensus, before its data is extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    /// Consensus header of the block.
    pub header: RawHeader,
    /// Shares of the original data square in row-major order.
    pub data: Vec<Share>,
}

impl RawBlock {
    /// Height of the block.
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Extend the data of the block into an [`ExtendedDataSquare`].
    pub fn extend(&self) -> Result<ExtendedDataSquare> {
        ExtendedDataSquare::from_ods(self.data.clone())
    }
}

/// Block with extended data and the header committing to it.
///
/// Blocks are assembled once and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Header of the block.
    pub header: ExtendedHeader,
    /// Extended data of the block.
    pub data: ExtendedDataSquare,
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}; square width: {}", self.header, self.square_width())
    }
}

impl Block {
    /// Assemble a block out of the header and the data.
    ///
    /// # Errors
    ///
    /// Returns an error if the width of the data doesn't match the header.
    pub fn new(header: ExtendedHeader, data: ExtendedDataSquare) -> Result<Self> {
        if header.dah.square_width() != data.square_width() {
            bail_validation!(
                "dah square width ({}) != eds square width ({})",
                header.dah.square_width(),
                data.square_width(),
            )
        }

        Ok(Block { header, data })
    }

    /// Height of the block.
    pub fn height(&self) -> u64 {
        self.header.height()
    }

    /// The [`DataAvailabilityHeader`] of the block.
    pub fn dah(&self) -> &DataAvailabilityHeader {
        &self.header.dah
    }

    /// Width of the extended data square.
    pub fn square_width(&self) -> u16 {
        self.data.square_width()
    }

    /// Merkle roots of the rows.
    pub fn row_roots(&self) -> &[NamespacedHash] {
        self.header.dah.row_roots()
    }

    /// Merkle roots of the columns.
    pub fn column_roots(&self) -> &[NamespacedHash] {
        self.header.dah.column_roots()
    }
}
