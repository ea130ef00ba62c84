use crate::consts::{MIN_SHARE_SIZE, NS_SIZE};
use crate::nmt::Namespace;
use crate::{Error, Result};

/// A single fixed size chunk of the data square.
///
/// The first [`NS_SIZE`] bytes of a data share hold its [`Namespace`]. Parity shares are
/// produced by the erasure coding and carry no namespace of their own, they always belong
/// to [`Namespace::PARITY_SHARE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    data: Vec<u8>,
    is_parity: bool,
}

impl Share {
    /// Create a new data [`Share`] from raw bytes.
    ///
    /// # Errors
    ///
    /// This function will return an error if the slice is too short to hold a namespace.
    pub fn from_raw(data: &[u8]) -> Result<Self> {
        Share::from_vec(data.to_vec(), false)
    }

    /// Create a new parity [`Share`] from raw bytes.
    ///
    /// # Errors
    ///
    /// This function will return an error if the slice is shorter than [`MIN_SHARE_SIZE`].
    pub fn parity(data: &[u8]) -> Result<Self> {
        Share::from_vec(data.to_vec(), true)
    }

    /// Create a data share in the given namespace holding the payload.
    pub fn new(namespace: Namespace, payload: &[u8]) -> Self {
        let mut data = Vec::with_capacity(NS_SIZE + payload.len());
        data.extend_from_slice(namespace.as_bytes());
        data.extend_from_slice(payload);

        Share {
            data,
            is_parity: false,
        }
    }

    pub(crate) fn from_vec(data: Vec<u8>, is_parity: bool) -> Result<Self> {
        if data.len() < MIN_SHARE_SIZE {
            return Err(Error::InvalidShareSize(data.len()));
        }

        Ok(Share { data, is_parity })
    }

    /// Returns true if share contains parity data.
    pub fn is_parity(&self) -> bool {
        self.is_parity
    }

    /// Get the [`Namespace`] the [`Share`] belongs to.
    pub fn namespace(&self) -> Namespace {
        if self.is_parity {
            return Namespace::PARITY_SHARE;
        }

        let mut ns = [0; NS_SIZE];
        ns.copy_from_slice(&self.data[..NS_SIZE]);
        Namespace::new(ns)
    }

    /// Returns the bytes following the namespace.
    pub fn payload(&self) -> &[u8] {
        &self.data[NS_SIZE..]
    }

    /// Size of the share in bytes.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Converts this [`Share`] into the raw bytes vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// Consumes the share returning its raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for Share {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
