use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::{bail_validation, DataAvailabilityHeader, RawHeader, Result, ValidateBasic};

/// Consensus header together with the [`DataAvailabilityHeader`] of the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedHeader {
    /// Consensus header.
    pub header: RawHeader,
    /// Header of the extended data of the block.
    pub dah: DataAvailabilityHeader,
}

impl Display for ExtendedHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "height: {}; dah hash: {}", self.height(), self.dah.hash())
    }
}

impl ExtendedHeader {
    /// Create a new header and validate it.
    pub fn new(header: RawHeader, dah: DataAvailabilityHeader) -> Result<Self> {
        let header = ExtendedHeader { header, dah };
        header.validate()?;
        Ok(header)
    }

    /// Height of the block.
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Data commitment of the consensus header.
    pub fn data_hash(&self) -> Hash {
        self.header.data_hash
    }

    /// Validate header.
    ///
    /// The data commitment of the consensus header must be equal to the hash of the
    /// [`DataAvailabilityHeader`], unless the consensus header doesn't commit to data.
    pub fn validate(&self) -> Result<()> {
        self.dah.validate_basic()?;

        // ensure data root from raw header matches computed root
        if self.header.data_hash != Hash::None && self.dah.hash() != self.header.data_hash {
            bail_validation!(
                "dah hash ({}) != header data hash ({})",
                self.dah.hash(),
                self.header.data_hash,
            )
        }

        Ok(())
    }
}
