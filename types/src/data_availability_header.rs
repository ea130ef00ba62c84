use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tendermint::merkle::simple_hash_from_byte_vectors;

use crate::consts::{MAX_EXTENDED_SQUARE_WIDTH, MIN_EXTENDED_SQUARE_WIDTH};
use crate::eds::AxisType;
use crate::hash::Hash;
use crate::nmt::{NamespacedHash, NamespacedHashExt, NodeVisitor};
use crate::{bail_validation, Error, ExtendedDataSquare, Result, ValidateBasic, ValidationError};

/// Header with commitments of the data availability.
///
/// It consists of the root hashes of the merkle trees created from each
/// row and column of the [`ExtendedDataSquare`].
///
/// The hash of this header is a hash of all rows and columns and thus a
/// data commitment of the block.
///
/// # Example
///
/// ```
/// use lumina_da_types::{DataAvailabilityHeader, ExtendedDataSquare, Share};
/// use lumina_da_types::nmt::Namespace;
///
/// let share = Share::new(Namespace::new([0, 0, 0, 0, 0, 0, 0, 1]), &[0xab; 32]);
/// let eds = ExtendedDataSquare::from_ods(vec![share]).unwrap();
/// let dah = DataAvailabilityHeader::from_eds(&eds).unwrap();
///
/// assert_eq!(dah.square_width(), 2);
/// assert_eq!(dah.row_root(0).unwrap(), eds.row_roots().unwrap()[0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "RawDataAvailabilityHeader",
    into = "RawDataAvailabilityHeader"
)]
pub struct DataAvailabilityHeader {
    /// Merkle roots of the [`ExtendedDataSquare`] rows.
    row_roots: Vec<NamespacedHash>,
    /// Merkle roots of the [`ExtendedDataSquare`] columns.
    column_roots: Vec<NamespacedHash>,
}

impl DataAvailabilityHeader {
    /// Create a new [`DataAvailabilityHeader`] out of the given roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the roots don't pass [`ValidateBasic`].
    pub fn new(row_roots: Vec<NamespacedHash>, column_roots: Vec<NamespacedHash>) -> Result<Self> {
        let dah = DataAvailabilityHeader::new_unchecked(row_roots, column_roots);
        dah.validate_basic()?;
        Ok(dah)
    }

    /// Create a new [`DataAvailabilityHeader`] out of the given roots without validation.
    pub fn new_unchecked(
        row_roots: Vec<NamespacedHash>,
        column_roots: Vec<NamespacedHash>,
    ) -> Self {
        DataAvailabilityHeader {
            row_roots,
            column_roots,
        }
    }

    /// Create a DataAvailabilityHeader by computing roots of a given [`ExtendedDataSquare`].
    pub fn from_eds(eds: &ExtendedDataSquare) -> Result<Self> {
        DataAvailabilityHeader::from_eds_with_visitor(eds, ())
    }

    /// Create a DataAvailabilityHeader by computing roots of a given [`ExtendedDataSquare`],
    /// reporting every node of every tree to the `visitor`.
    ///
    /// Trees of all the rows are built first, in the index order, and then the trees of
    /// all the columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VisitAborted`] as soon as the visitor stops the construction.
    pub fn from_eds_with_visitor<V>(eds: &ExtendedDataSquare, mut visitor: V) -> Result<Self>
    where
        V: NodeVisitor,
    {
        let square_width = eds.square_width();

        let mut dah = DataAvailabilityHeader {
            row_roots: Vec::with_capacity(square_width.into()),
            column_roots: Vec::with_capacity(square_width.into()),
        };

        for index in 0..square_width {
            let root = eds.axis_root_with_visitor(AxisType::Row, index, &mut visitor)?;
            dah.row_roots.push(root);
        }

        for index in 0..square_width {
            let root = eds.axis_root_with_visitor(AxisType::Col, index, &mut visitor)?;
            dah.column_roots.push(root);
        }

        Ok(dah)
    }

    /// Merkle roots of the [`ExtendedDataSquare`] rows.
    pub fn row_roots(&self) -> &[NamespacedHash] {
        &self.row_roots
    }

    /// Merkle roots of the [`ExtendedDataSquare`] columns.
    pub fn column_roots(&self) -> &[NamespacedHash] {
        &self.column_roots
    }

    /// Get the root from an axis at the given index.
    pub fn root(&self, axis: AxisType, index: u16) -> Option<NamespacedHash> {
        match axis {
            AxisType::Col => self.column_root(index),
            AxisType::Row => self.row_root(index),
        }
    }

    /// Get a root of the row with the given index.
    pub fn row_root(&self, row: u16) -> Option<NamespacedHash> {
        let row = usize::from(row);
        self.row_roots.get(row).cloned()
    }

    /// Get the a root of the column with the given index.
    pub fn column_root(&self, column: u16) -> Option<NamespacedHash> {
        let column = usize::from(column);
        self.column_roots.get(column).cloned()
    }

    /// Compute the combined hash of all rows and columns.
    ///
    /// This is the data commitment for the block.
    pub fn hash(&self) -> Hash {
        let all_roots: Vec<_> = self
            .row_roots
            .iter()
            .chain(self.column_roots.iter())
            .map(|root| root.to_array())
            .collect();

        Hash::Sha256(simple_hash_from_byte_vectors::<Sha256>(&all_roots))
    }

    /// Get the size of the [`ExtendedDataSquare`] for which this header was built.
    pub fn square_width(&self) -> u16 {
        // `validate_basic` checks that rows num = cols num
        self.row_roots
            .len()
            .try_into()
            // On validated DAH this never happens
            .unwrap_or(u16::MAX)
    }
}

/// Serialized form of the [`DataAvailabilityHeader`] holding raw roots.
#[derive(Serialize, Deserialize)]
pub struct RawDataAvailabilityHeader {
    /// Raw roots of the rows.
    pub row_roots: Vec<Vec<u8>>,
    /// Raw roots of the columns.
    pub column_roots: Vec<Vec<u8>>,
}

impl TryFrom<RawDataAvailabilityHeader> for DataAvailabilityHeader {
    type Error = Error;

    fn try_from(value: RawDataAvailabilityHeader) -> Result<Self, Self::Error> {
        let row_roots = value
            .row_roots
            .iter()
            .map(|bytes| NamespacedHash::from_raw(bytes))
            .collect::<Result<Vec<_>>>()?;
        let column_roots = value
            .column_roots
            .iter()
            .map(|bytes| NamespacedHash::from_raw(bytes))
            .collect::<Result<Vec<_>>>()?;

        DataAvailabilityHeader::new(row_roots, column_roots)
    }
}

impl From<DataAvailabilityHeader> for RawDataAvailabilityHeader {
    fn from(value: DataAvailabilityHeader) -> RawDataAvailabilityHeader {
        RawDataAvailabilityHeader {
            row_roots: value.row_roots.iter().map(|hash| hash.to_vec()).collect(),
            column_roots: value
                .column_roots
                .iter()
                .map(|hash| hash.to_vec())
                .collect(),
        }
    }
}

impl ValidateBasic for DataAvailabilityHeader {
    fn validate_basic(&self) -> Result<(), ValidationError> {
        if self.column_roots.len() != self.row_roots.len() {
            bail_validation!(
                "column_roots len ({}) != row_roots len ({})",
                self.column_roots.len(),
                self.row_roots.len(),
            )
        }

        if self.row_roots.len() < MIN_EXTENDED_SQUARE_WIDTH {
            bail_validation!(
                "row_roots len ({}) < minimum ({})",
                self.row_roots.len(),
                MIN_EXTENDED_SQUARE_WIDTH,
            )
        }

        if self.row_roots.len() > MAX_EXTENDED_SQUARE_WIDTH {
            bail_validation!(
                "row_roots len ({}) > maximum ({})",
                self.row_roots.len(),
                MAX_EXTENDED_SQUARE_WIDTH,
            )
        }

        Ok(())
    }
}
