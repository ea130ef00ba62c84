//! Types related to EDS.

use std::fmt::Display;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::consts::MAX_ODS_WIDTH;
use crate::nmt::{NamespacedHash, NmtBuilder, NodeVisitor};
use crate::{Error, Result, Share};

/// Represents either column or row of the [`ExtendedDataSquare`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisType {
    /// A row of the data square.
    Row = 0,
    /// A column of the data square.
    Col,
}

impl Display for AxisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisType::Row => write!(f, "Row"),
            AxisType::Col => write!(f, "Column"),
        }
    }
}

/// The original data square extended with parity data.
///
/// # Structure
///
/// The [`ExtendedDataSquare`] consists of four quadrants. The first
/// quadrant (upper-left) is the original data square. The other three quadrants
/// are the parity data encoded row-wise or column-wise with the Reed-Solomon [`Codec`].
///
/// First, the 2nd and 3rd quadrants are created by computing parity data of the
/// original data square, row-wise for 2nd and column-wise for 3rd quadrant. Then,
/// the 4th quadrant is computed row-wise from the 3rd one, which gives the same
/// shares as encoding the 2nd one column-wise.
///
/// ```text
///  ---------------------------
/// |             |             |
/// |           --|->           |
/// |      1    --|->    2      |
/// |           --|->           |
/// |    | | |    |             |
///  -------------+-------------
/// |    v v v    |             |
/// |           --|->           |
/// |      3    --|->    4      |
/// |           --|->           |
/// |             |             |
///  ---------------------------
/// ```
///
/// Every share outside of the first quadrant is a parity share and belongs to the
/// [`Namespace::PARITY_SHARE`] namespace.
///
/// [`Codec`]: crate::codec::Codec
/// [`Namespace::PARITY_SHARE`]: crate::nmt::Namespace::PARITY_SHARE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedDataSquare {
    /// The shares of the EDS in row-major order.
    data_square: Vec<Share>,
    /// pre-calculated square width
    square_width: u16,
}

impl ExtendedDataSquare {
    /// Create a new EDS out of the provided original data square shares.
    ///
    /// Shares should be provided in a row-major order, i.e. first shares of the first row,
    /// then of the second row and so on.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    ///  - there are no shares or their amount doesn't allow for forming a square
    ///  - width of the original square is bigger than [`MAX_ODS_WIDTH`]
    ///  - shares are of different sizes
    ///  - namespaces of shares aren't in non-decreasing order row and column wise
    ///
    /// Additionally, this function will propagate any error from encoding parity data.
    pub fn from_ods(ods: Vec<Share>) -> Result<Self> {
        if ods.is_empty() {
            return Err(Error::InvalidInputShape(
                "original data square is empty".to_string(),
            ));
        }

        let ods_width = f64::sqrt(ods.len() as f64) as usize;
        if ods_width * ods_width != ods.len() {
            return Err(Error::InvalidInputShape(format!(
                "{} shares can't form a square",
                ods.len()
            )));
        }

        if ods_width > MAX_ODS_WIDTH {
            return Err(Error::InvalidInputShape(format!(
                "original square width ({ods_width}) > maximum ({MAX_ODS_WIDTH})"
            )));
        }

        let share_size = ods[0].len();
        if let Some(share) = ods.iter().find(|share| share.len() != share_size) {
            return Err(Error::ShareSizeMismatch {
                expected: share_size,
                got: share.len(),
            });
        }

        check_namespaces_order(&ods, ods_width)?;

        let eds_width = ods_width * 2;
        let mut shares = Vec::with_capacity(eds_width * eds_width);
        let mut ods = ods.into_iter().map(Share::into_vec);

        // take rows of ods and interleave them with slots for the parity
        for _ in 0..ods_width {
            shares.extend(ods.by_ref().take(ods_width));
            shares.resize(shares.len() + ods_width, Vec::new());
        }
        // bottom half of the square is parity only
        shares.resize(eds_width * eds_width, Vec::new());

        let codec = Codec::new(ods_width)?;

        // 2nd quadrant - encode parity of rows of 1st quadrant
        for row in shares.chunks_mut(eds_width).take(ods_width) {
            codec.encode(row)?;
        }
        // 3rd quadrant - encode parity of columns of 1st quadrant
        for col in 0..ods_width {
            let mut column: Vec<_> = (0..eds_width)
                .map(|row| mem::take(&mut shares[row * eds_width + col]))
                .collect();

            codec.encode(&mut column)?;

            for (row, share) in column.into_iter().enumerate() {
                shares[row * eds_width + col] = share;
            }
        }
        // 4th quadrant - encode parity of rows of 3rd quadrant
        for row in shares.chunks_mut(eds_width).skip(ods_width) {
            codec.encode(row)?;
        }

        // width is bounded by twice the MAX_ODS_WIDTH
        let square_width = eds_width as u16;

        let data_square = shares
            .into_iter()
            .enumerate()
            .map(|(idx, bytes)| {
                let row = (idx / eds_width) as u16;
                let col = (idx % eds_width) as u16;
                Share::from_vec(bytes, !is_ods_square(row, col, square_width))
            })
            .collect::<Result<_>>()?;

        Ok(ExtendedDataSquare {
            data_square,
            square_width,
        })
    }

    /// Create a new EDS out of the rows of the original data square.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows don't form a square, and any error of
    /// [`ExtendedDataSquare::from_ods`].
    pub fn from_ods_rows(rows: Vec<Vec<Share>>) -> Result<Self> {
        let ods_width = rows.len();

        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != ods_width)
        {
            return Err(Error::InvalidInputShape(format!(
                "row {index} has {} shares, expected {ods_width}",
                row.len()
            )));
        }

        ExtendedDataSquare::from_ods(rows.into_iter().flatten().collect())
    }

    /// The shares of the EDS in row-major order.
    pub fn data_square(&self) -> &[Share] {
        &self.data_square
    }

    /// Returns the share of the provided coordinates.
    pub fn share(&self, row: u16, column: u16) -> Result<&Share> {
        if row >= self.square_width || column >= self.square_width {
            return Err(Error::EdsIndexOutOfRange(row, column));
        }

        self.data_square
            .get(flatten_index(row, column, self.square_width))
            .ok_or(Error::EdsIndexOutOfRange(row, column))
    }

    /// Returns the shares of a row.
    pub fn row(&self, index: u16) -> Result<Vec<Share>> {
        self.axis(AxisType::Row, index)
    }

    /// Returns the shares of a column.
    pub fn column(&self, index: u16) -> Result<Vec<Share>> {
        self.axis(AxisType::Col, index)
    }

    /// Returns the shares of column or row.
    pub fn axis(&self, axis: AxisType, index: u16) -> Result<Vec<Share>> {
        (0..self.square_width)
            .map(|i| {
                let (row, col) = axis_coords(axis, index, i);
                self.share(row, col).map(ToOwned::to_owned)
            })
            .collect()
    }

    /// Get EDS square width.
    pub fn square_width(&self) -> u16 {
        self.square_width
    }

    /// Get the width of the original data square.
    pub fn ods_width(&self) -> u16 {
        self.square_width / 2
    }

    /// Returns true if the coordinates belong to the original data square.
    pub fn is_ods_square(&self, row: u16, column: u16) -> bool {
        is_ods_square(row, column, self.square_width)
    }

    /// Compute the merkle root of a row or column, reporting every created node to the `visitor`.
    pub fn axis_root_with_visitor<V>(
        &self,
        axis: AxisType,
        index: u16,
        visitor: V,
    ) -> Result<NamespacedHash>
    where
        V: NodeVisitor,
    {
        if index >= self.square_width {
            let (row, col) = axis_coords(axis, index, 0);
            return Err(Error::EdsIndexOutOfRange(row, col));
        }

        let mut tree = NmtBuilder::with_visitor(visitor);

        for i in 0..self.square_width {
            let (row, col) = axis_coords(axis, index, i);
            let share = self.share(row, col)?;

            tree.push_leaf(share.as_ref(), share.namespace())?;
        }

        tree.root()
    }

    /// Compute the merkle root of a row or column.
    pub fn axis_root(&self, axis: AxisType, index: u16) -> Result<NamespacedHash> {
        self.axis_root_with_visitor(axis, index, ())
    }

    /// Compute the merkle roots of all the rows.
    pub fn row_roots(&self) -> Result<Vec<NamespacedHash>> {
        (0..self.square_width)
            .map(|i| self.axis_root(AxisType::Row, i))
            .collect()
    }

    /// Compute the merkle roots of all the columns.
    pub fn column_roots(&self) -> Result<Vec<NamespacedHash>> {
        (0..self.square_width)
            .map(|i| self.axis_root(AxisType::Col, i))
            .collect()
    }
}

fn check_namespaces_order(ods: &[Share], ods_width: usize) -> Result<()> {
    for index in 0..ods_width {
        let row_sorted = ods[index * ods_width..(index + 1) * ods_width]
            .windows(2)
            .all(|pair| pair[0].namespace() <= pair[1].namespace());

        if !row_sorted {
            return Err(Error::UnsortedNamespaces {
                axis: AxisType::Row,
                index: index as u16,
            });
        }
    }

    for index in 0..ods_width {
        let mut column = ods.iter().skip(index).step_by(ods_width);
        let mut prev_ns = column.next().map(Share::namespace);

        for share in column {
            let ns = share.namespace();
            if prev_ns.is_some_and(|prev_ns| ns < prev_ns) {
                return Err(Error::UnsortedNamespaces {
                    axis: AxisType::Col,
                    index: index as u16,
                });
            }
            prev_ns = Some(ns);
        }
    }

    Ok(())
}

/// Returns true if and only if the provided coordinates belongs to Original Data Square
/// (i.e. first quadrant of Extended Data Square).
pub fn is_ods_square(row: u16, column: u16, square_width: u16) -> bool {
    let ods_width = square_width / 2;
    row < ods_width && column < ods_width
}

fn axis_coords(axis: AxisType, index: u16, position: u16) -> (u16, u16) {
    match axis {
        AxisType::Row => (index, position),
        AxisType::Col => (position, index),
    }
}

fn flatten_index(row: u16, col: u16, square_width: u16) -> usize {
    usize::from(row) * usize::from(square_width) + usize::from(col)
}
